#![allow(dead_code)]

use cre_signals_api::config::Config;
use cre_signals_api::handlers::AppState;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use std::sync::Arc;

/// Nothing listens on port 1, so connections are refused immediately.
pub const UNREACHABLE: &str = "http://127.0.0.1:1";

/// Config with every upstream pointed at `upstream` and fast retries.
pub fn test_config(upstream: &str, data_dir: &Path) -> Config {
    Config {
        port: 0,
        census_api_key: "test_census_key".to_string(),
        mapbox_access_token: Some("test_mapbox_token".to_string()),
        listing_base_url: upstream.to_string(),
        census_base_url: upstream.to_string(),
        news_base_url: upstream.to_string(),
        rates_url: format!("{}/commercial-rates.php", upstream),
        mapbox_base_url: upstream.to_string(),
        data_dir: data_dir.to_path_buf(),
        http_timeout_secs: 5,
        cache_ttl_secs: 60,
        news_max_results: 10,
        fetch_max_retries: 1,
        fetch_backoff_ms: 1,
        cors_origins: vec!["http://localhost:3000".to_string()],
    }
}

pub fn test_state(config: Config) -> Arc<AppState> {
    Arc::new(AppState::new(config).expect("state should build"))
}

pub const LISTING_PAGE: &str = r#"
<html><body>
  <div class="ds-summary-row">$3,100,000</div>
  <div class="ds-address-container">500 Congress Ave, Austin, TX 78701</div>
  <span class="ds-home-type">Retail</span>
  <ul>
    <li class="ds-home-fact-list-item">8,400 sqft</li>
    <li class="ds-home-fact-list-item">Year Built: 2004</li>
  </ul>
  <div class="media-stream"><img src="https://img.example.com/a.jpg"></div>
</body></html>
"#;

pub const NEWS_PAGE: &str = r#"
<html><body>
  <article>
    <h3><a href="./articles/one">Austin office pipeline slows</a></h3>
    <p>Developers paused three towers.</p>
  </article>
  <article>
    <h4>Retail rents rebound downtown</h4>
    <a href="https://example.com/retail">Read more</a>
  </article>
</body></html>
"#;

pub const RATES_PAGE: &str = r#"
<html><body>
  <h2 id="keymarketinterestrates">Key Market Interest Rates</h2>
  <table>
    <tr><th>Index</th><th>Rate</th></tr>
    <tr><td>Prime Rate</td><td>8.50%</td></tr>
    <tr><td>10-Year Treasury</td><td>4.25%</td></tr>
  </table>
</body></html>
"#;

/// Lines of each page of the rent roll returned by [`rent_roll_pdf`].
pub const RENT_ROLL_PAGES: &[&[&str]] = &[
    &[
        "Rent Roll - Harbor Point Plaza",
        "Square Footage: 48,250",
        "Occupancy Rate: 92%",
    ],
    &[
        "Square Footage: 51,000",
        "Acme Coffee Co   $4,500.00   Paid rent",
        "Lease End Date: 12/31/2027",
    ],
];

/// A two-page PDF where each page is one text object with a `Td` move per
/// line, the way most report generators lay out text.
pub fn rent_roll_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in RENT_ROLL_PAGES {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
            }
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => kids.len() as i64,
        "Kids" => kids,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
