//! Resolution of the client's configured address into a WebSocket URL.

use url::Url;

use super::error::WsError;

/// Resolve `address` into an absolute `ws://` or `wss://` URL.
///
/// Relative addresses are joined onto `page_origin`. The scheme follows the
/// page: an `https` page yields `wss`, anything else yields `ws`. Absolute
/// `http(s)` addresses are rewritten to their WebSocket counterpart.
pub fn resolve(address: &str, page_origin: Option<&Url>) -> Result<Url, WsError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(WsError::TransportConstruction(
            "address must not be empty".to_owned(),
        ));
    }

    match Url::parse(address) {
        Ok(url) => to_websocket_scheme(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let origin = page_origin.ok_or_else(|| {
                WsError::TransportConstruction(format!(
                    "relative address {address} requires a page origin"
                ))
            })?;
            let joined = origin
                .join(address)
                .map_err(|e| WsError::TransportConstruction(e.to_string()))?;
            to_websocket_scheme(joined)
        }
        Err(e) => Err(WsError::TransportConstruction(format!(
            "invalid address {address}: {e}"
        ))),
    }
}

fn to_websocket_scheme(mut url: Url) -> Result<Url, WsError> {
    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(WsError::TransportConstruction(format!(
                "unsupported scheme {other}"
            )));
        }
    };

    if url.scheme() != scheme {
        // `http` -> `ws` and `https` -> `wss` are both special schemes, so this never fails
        url.set_scheme(scheme).map_err(|()| {
            WsError::TransportConstruction(format!("cannot switch scheme to {scheme}"))
        })?;
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn absolute_ws_address_is_kept() {
        let url = resolve("ws://10.0.0.5:8000/ws", None).unwrap();
        assert_eq!(url.as_str(), "ws://10.0.0.5:8000/ws");
    }

    #[test]
    fn relative_path_uses_plain_scheme_on_http_page() {
        let page = origin("http://rover.local:8080/dashboard");
        let url = resolve("/ws", Some(&page)).unwrap();
        assert_eq!(url.as_str(), "ws://rover.local:8080/ws");
    }

    #[test]
    fn relative_path_uses_encrypted_scheme_on_https_page() {
        let page = origin("https://rover.example.com/dashboard/");
        let url = resolve("/ws", Some(&page)).unwrap();
        assert_eq!(url.as_str(), "wss://rover.example.com/ws");
    }

    #[test]
    fn http_address_is_rewritten() {
        let url = resolve("https://rover.example.com/ws", None).unwrap();
        assert_eq!(url.scheme(), "wss");
    }

    #[test]
    fn relative_path_without_origin_fails() {
        let err = resolve("/ws", None).unwrap_err();
        assert!(matches!(err, WsError::TransportConstruction(_)));
    }

    #[test]
    fn unsupported_scheme_fails() {
        let err = resolve("ftp://rover.local/ws", None).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme ftp"));
    }

    #[test]
    fn empty_address_fails() {
        assert!(resolve("  ", None).is_err());
    }
}
