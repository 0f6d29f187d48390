//! Logs in and runs one search against a live service.
//!
//! ALERTMAP_URL, ALERTMAP_USER and ALERTMAP_PASSWORD select the server and
//! account; the first command line argument, if any, is the disease filter.

use alertmap::client::QueryParams;
use alertmap::config::DEFAULT_URL;
use alertmap::output;
use alertmap::runner::{Options, Runner};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let url = std::env::var("ALERTMAP_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let user = std::env::var("ALERTMAP_USER")?;
    let password = std::env::var("ALERTMAP_PASSWORD")?;

    let mut runner = Runner::new(Options {
        url,
        ..Options::default()
    })?;
    runner.login(&user, &password).await?;

    let params = QueryParams {
        disease: std::env::args().nth(1),
        limit: Some(200),
        ..Default::default()
    };
    let result = runner.search(&params).await?;
    println!(
        "{} alerts at {} locations in {}ms",
        result.state.records().len(),
        result.state.points().len(),
        result.elapsed.as_millis()
    );
    let window = output::list_window(&result.state, 10);
    print!(
        "{}",
        String::from_utf8_lossy(&output::render_text(&result.state, window))
    );
    Ok(())
}
