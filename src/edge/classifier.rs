//! Route classification of canonical URLs

use url::Url;

use crate::types::Route;

/// Classify a canonical URL.
///
/// `/<account>/<repository>/<index_route>` (and anything below it) is the
/// synthesized index page; every other path is content.
pub fn classify(canonical_url: &str, index_route: &str) -> Route {
    let Ok(url) = Url::parse(canonical_url) else {
        return Route::Content;
    };

    // components[0] is the empty segment before the leading '/'
    let components: Vec<&str> = url.path().split('/').collect();
    if components.len() > 3 && components[3] == index_route {
        Route::Index
    } else {
        Route::Content
    }
}
