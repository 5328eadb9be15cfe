//! PAC script rendering.
//!
//! The generated script embeds both domain tables as object literals and
//! resolves a host by walking up its parent domains, so a lookup costs one
//! hash probe per label instead of a scan over the whole list.

use crate::rules::{Domain, Lists};

/// Marker inside `FindProxyForURL` where a custom snippet can be spliced in.
pub const CUSTOM_PLACEHOLDER: &str = "/*__CUSTOM_PAC__*/";

/// Directive returned for hosts that bypass the proxy.
pub const DIRECT: &str = "DIRECT";

/// Error type for script rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The script does not contain the custom injection placeholder.
    #[error("PAC script is missing the custom placeholder {CUSTOM_PLACEHOLDER}")]
    MissingPlaceholder,
}

const MATCH_DOMAIN_FN: &str = "\
function matchDomain(map, host) {
    if (!host) return false;
    host = host.toLowerCase();
    if (map[host] === 1) return true;
    var pos = host.indexOf('.');
    while (pos !== -1) {
        host = host.substring(pos + 1);
        if (map[host] === 1) return true;
        pos = host.indexOf('.');
    }
    return false;
}
";

/// Render a PAC script from the given domain tables.
///
/// `proxy` is inserted verbatim as the directive for proxied hosts, e.g.
/// `"SOCKS5 127.0.0.1:1080; DIRECT"`. Direct matches are checked first and
/// hosts matching neither table go `DIRECT`.
///
/// Output depends only on the inputs, so rendering the same lists twice
/// yields byte-identical scripts.
///
/// # Errors
///
/// Returns [`RenderError::MissingPlaceholder`] if the rendered script lacks
/// [`CUSTOM_PLACEHOLDER`].
///
/// # Example
///
/// ```
/// use pacserve::pac::render;
/// use pacserve::rules::merge_tiers;
///
/// let lists = merge_tiers([vec!["example.com"]], [Vec::<&str>::new()]);
/// let script = render(&lists, "PROXY 127.0.0.1:3128").unwrap();
/// assert!(script.contains("\"example.com\": 1"));
/// assert!(script.contains("function FindProxyForURL(url, host)"));
/// ```
pub fn render(lists: &Lists, proxy: &str) -> Result<String, RenderError> {
    let mut out = String::with_capacity(1024 + (lists.proxy.len() + lists.direct.len()) * 32);

    out.push_str("// Generated by pacserve from a gfwlist-style rule list.\n\n");

    out.push_str("var proxy = \"");
    out.push_str(proxy);
    out.push_str("\";\n");
    out.push_str("var direct = \"DIRECT\";\n\n");

    out.push_str("var proxyDomains = {\n");
    write_domain_map(&mut out, &lists.proxy);
    out.push_str("};\n\n");

    out.push_str("var directDomains = {\n");
    write_domain_map(&mut out, &lists.direct);
    out.push_str("};\n\n");

    out.push_str(MATCH_DOMAIN_FN);
    out.push('\n');

    out.push_str("function FindProxyForURL(url, host) {\n");
    out.push_str("    ");
    out.push_str(CUSTOM_PLACEHOLDER);
    out.push('\n');
    out.push_str("    if (matchDomain(directDomains, host)) return direct;\n");
    out.push_str("    if (matchDomain(proxyDomains, host)) return proxy;\n");
    out.push_str("    return direct;\n");
    out.push_str("}\n");

    if !out.contains(CUSTOM_PLACEHOLDER) {
        return Err(RenderError::MissingPlaceholder);
    }
    Ok(out)
}

/// Replace the custom placeholder in `script` with `snippet`.
///
/// Only the first occurrence is replaced.
///
/// # Errors
///
/// Returns [`RenderError::MissingPlaceholder`] if `script` does not contain
/// [`CUSTOM_PLACEHOLDER`].
pub fn inject_custom(script: &str, snippet: &str) -> Result<String, RenderError> {
    if !script.contains(CUSTOM_PLACEHOLDER) {
        return Err(RenderError::MissingPlaceholder);
    }
    Ok(script.replacen(CUSTOM_PLACEHOLDER, snippet, 1))
}

// Entries are separated without a trailing comma for older JS engines.
fn write_domain_map(out: &mut String, domains: &[Domain]) {
    let last = domains.len().saturating_sub(1);
    for (idx, domain) in domains.iter().enumerate() {
        out.push_str("    \"");
        out.push_str(domain.as_str());
        out.push_str(if idx == last { "\": 1\n" } else { "\": 1,\n" });
    }
}
