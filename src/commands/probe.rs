use anyhow::Result;
use indexable_redirect::{
    config::Config,
    edge::{classify, DatetimeMarkerExtractor, OriginProber, UrlTranslator},
    transport::HttpTransport,
    types::Route,
};
use serde_json::json;
use std::sync::Arc;

use crate::OutputFormat;

/// Probe a single page without the mirror fetch
pub async fn probe(config: Config, url: String, format: OutputFormat) -> Result<()> {
    let translator = UrlTranslator::from_config(&config.mirror);
    let canonical_url = translator.to_canonical(&url);
    let route = classify(&canonical_url, &config.mirror.index_route);

    if route == Route::Index {
        match format {
            OutputFormat::Json => println!(
                "{}",
                json!({ "canonical_url": canonical_url, "route": route, "verdict": null })
            ),
            OutputFormat::Text => {
                println!("Canonical URL: {}", canonical_url);
                println!("Route: index (never probed, always served by the mirror)");
            }
        }
        return Ok(());
    }

    let transport = Arc::new(HttpTransport::new(&config.transport)?);
    let extractor = Arc::new(DatetimeMarkerExtractor::new(&config.mirror.timestamp_selector)?);
    let prober = OriginProber::from_config(&config, transport, extractor)?;

    let verdict = prober.probe(&canonical_url).await?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "canonical_url": canonical_url,
                "route": route,
                "verdict": verdict,
            }))?
        ),
        OutputFormat::Text => {
            println!("Canonical URL: {}", canonical_url);
            println!("Route: {}", route);
            println!("Verdict: {}", verdict);
        }
    }

    Ok(())
}
