use super::{parse_dataset, Dataset, DatasetKind};
use crate::error::FetchError;
use std::time::Duration;
use tracing::{debug, info};

/// Where fresh datasets come from
pub trait DatasetSource {
    fn fetch(&self, kind: DatasetKind) -> Result<Dataset, FetchError>;
}

/// Blocking client for a single Overpass interpreter endpoint
pub struct OverpassClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    area_id: u64,
}

impl OverpassClient {
    pub fn new(endpoint: impl Into<String>, area_id: u64) -> Result<Self, FetchError> {
        // Country-wide `out geom` queries can take minutes; wait for them
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("lgv-map/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            area_id,
        })
    }
}

impl DatasetSource for OverpassClient {
    fn fetch(&self, kind: DatasetKind) -> Result<Dataset, FetchError> {
        let query = kind.query(self.area_id);
        debug!(%kind, endpoint = %self.endpoint, "requesting dataset");

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("data", query.as_str())])
            .send()?
            .error_for_status()?;
        let mut body = response.bytes()?.to_vec();
        let dataset = parse_dataset(&mut body)?;

        info!(%kind, elements = dataset.len(), bytes = body.len(), "dataset fetched");
        Ok(dataset)
    }
}

/// Source used with `--offline`: every fetch fails, so only the cache is read
pub struct OfflineSource;

impl DatasetSource for OfflineSource {
    fn fetch(&self, kind: DatasetKind) -> Result<Dataset, FetchError> {
        Err(FetchError::Unavailable(format!(
            "offline mode, no cached {kind} data"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    const BODY: &str = r#"{"elements":[{"type":"way","id":1,
        "geometry":[{"lat":48.85,"lon":2.35},{"lat":48.60,"lon":3.10}],
        "tags":{"name":"LGV Est","ref":"LN6"}}]}"#;

    /// Serve one HTTP request after `delay`, returning the endpoint URL and
    /// a receiver for the request line
    fn serve_once(
        status: &'static str,
        body: &'static str,
        delay: Duration,
    ) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/interpreter", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let text = String::from_utf8_lossy(&request);
            let _ = tx.send(text.lines().next().unwrap_or_default().to_string());

            thread::sleep(delay);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        });

        (url, rx)
    }

    #[test]
    fn test_fetch_sends_query_and_parses_body() {
        let (url, requests) = serve_once("200 OK", BODY, Duration::ZERO);
        let client = OverpassClient::new(url, 3602202162).unwrap();

        let dataset = client.fetch(DatasetKind::Lgv).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.elements[0].tags.name.as_deref(), Some("LGV Est"));
        assert_eq!(dataset.elements[0].tags.reference.as_deref(), Some("LN6"));

        let request_line = requests.recv().unwrap();
        assert!(request_line.starts_with("GET /api/interpreter?data="));
        assert!(request_line.contains("3602202162"));
    }

    #[test]
    fn test_fetch_error_status_is_http_error() {
        let (url, _requests) = serve_once("504 Gateway Timeout", "{}", Duration::ZERO);
        let client = OverpassClient::new(url, 3602202162).unwrap();

        let err = client.fetch(DatasetKind::Tunnels).unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }

    #[test]
    fn test_fetch_html_body_is_parse_error() {
        let (url, _requests) = serve_once("200 OK", "<html>rate limited</html>", Duration::ZERO);
        let client = OverpassClient::new(url, 3602202162).unwrap();

        let err = client.fetch(DatasetKind::Lgv).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn test_fetch_waits_for_slow_response() {
        // Longer than reqwest's default 30 s request timeout
        let (url, _requests) = serve_once("200 OK", BODY, Duration::from_secs(32));
        let client = OverpassClient::new(url, 3602202162).unwrap();

        let dataset = client.fetch(DatasetKind::Lgv).unwrap();
        assert_eq!(dataset.len(), 1);
    }
}
