use anyhow::Result;
use indexable_redirect::{
    config::Config,
    edge::{classify, UrlTranslator},
};

pub fn translate(config: Config, url: String) -> Result<()> {
    let translator = UrlTranslator::from_config(&config.mirror);
    let canonical_url = translator.to_canonical(&url);
    let route = classify(&canonical_url, &config.mirror.index_route);

    println!("Canonical URL: {}", canonical_url);
    println!("Route: {}", route);
    Ok(())
}
