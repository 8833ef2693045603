//! Landing page served at the configured base path.

use crate::config::Config;
use crate::{COMPAT_PREFIX, DISCOVERY_PREFIX};

/// Render the HTML landing page for the open base endpoint.
///
/// Lists the discovery entry points and the active authentication mode. The
/// page carries no catalog content, so it is safe to serve unauthenticated.
#[must_use]
pub fn render_landing_page(config: &Config) -> String {
    let title = &config.catalog.title;
    let mode = config.auth.mode.as_str();
    let version = env!("CARGO_PKG_VERSION");

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><title>{title}</title></head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         <p>ord-gateway v{version} (authentication mode: {mode})</p>\n\
         <ul>\n\
         <li><a href=\"{DISCOVERY_PREFIX}/documents/system-version\">{DISCOVERY_PREFIX}/documents/system-version</a></li>\n\
         <li><code>{DISCOVERY_PREFIX}/&lt;resource&gt;</code></li>\n\
         <li><code>{COMPAT_PREFIX}/&lt;resource&gt;</code></li>\n\
         </ul>\n\
         </body>\n\
         </html>\n"
    )
}
