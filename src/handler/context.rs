//! Per-request facade over the request and response views.

use std::convert::Infallible;
use std::path::Path;

use axum::body::Bytes;
use axum::http::{header, Method};
use futures_util::stream;
use multer::Multipart;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::handler::params::Params;
use crate::http::mime::content_type_for_extension;
use crate::http::{Request, Response};
use crate::json::decode_json;

/// A file part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    pub file_name: String,
    /// Content type declared for the part, if any.
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Request/response pair for one request, with parsing helpers.
///
/// Built per call by the context adapters; never shared between requests.
pub struct Context<'a> {
    req: &'a Request,
    res: &'a mut Response,
}

impl<'a> Context<'a> {
    pub fn new(req: &'a Request, res: &'a mut Response) -> Self {
        Self { req, res }
    }

    pub fn request(&self) -> &Request {
        self.req
    }

    pub fn response(&mut self) -> &mut Response {
        self.res
    }

    /// Fill `target` from the path parameters of the matched route.
    pub fn params_parser<T: Params>(&self, target: &mut T) -> Result {
        target.bind(self.req.params())?;
        Ok(())
    }

    /// Decode the JSON request body.
    pub fn body_parser<T: DeserializeOwned>(&self) -> Result<T> {
        decode_json(self.req.body())
    }

    /// Decode the query string into `T`. Only the first value of each key is
    /// kept, and every value is a JSON string.
    pub fn query_parser<T: DeserializeOwned>(&self) -> Result<T> {
        let mut fields = Map::new();
        for (key, value) in self.req.query_pairs() {
            fields.entry(key).or_insert(Value::String(value));
        }
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Decode the request headers into `T`. Keys are lower-case header names;
    /// only the first value of each header is kept.
    pub fn req_header_parser<T: DeserializeOwned>(&self) -> Result<T> {
        let mut fields = Map::new();
        for (name, value) in self.req.headers() {
            if let Ok(value) = value.to_str() {
                fields
                    .entry(name.as_str())
                    .or_insert(Value::String(value.to_string()));
            }
        }
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.req.header(key)
    }

    pub fn method(&self) -> &Method {
        self.req.method()
    }

    /// Client address: `X-Real-IP`, then `X-Forwarded-For`, then the peer.
    pub fn ip(&self) -> String {
        if let Some(ip) = self.non_empty_header("x-real-ip") {
            return ip.to_string();
        }
        if let Some(ip) = self.non_empty_header("x-forwarded-for") {
            return ip.to_string();
        }
        self.req
            .remote_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default()
    }

    /// Every address listed in `X-Forwarded-For`, or just [`Context::ip`].
    pub fn ips(&self) -> Vec<String> {
        match self.non_empty_header("x-forwarded-for") {
            Some(list) => list.split(',').map(|ip| ip.trim().to_string()).collect(),
            None => vec![self.ip()],
        }
    }

    fn non_empty_header(&self, key: &str) -> Option<&str> {
        self.req.header(key).filter(|value| !value.is_empty())
    }

    pub fn body(&self) -> &[u8] {
        self.req.body()
    }

    /// The first file uploaded under form field `key`.
    ///
    /// The buffered body is parsed with the boundary from the request's
    /// `multipart/form-data` content type. A field with that name but no file
    /// name is not a file. Blocks the calling thread, so only call it from a
    /// handler.
    pub fn form_file(&self, key: &str) -> Result<FormFile> {
        let content_type = self.req.header(header::CONTENT_TYPE.as_str()).unwrap_or_default();
        let boundary = multer::parse_boundary(content_type)?;
        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        runtime.block_on(read_form_file(self.req.bytes(), boundary, key))
    }

    pub fn query(&self, name: &str) -> Option<String> {
        self.req.query(name).filter(|value| !value.is_empty())
    }

    pub fn query_or(&self, name: &str, default: &str) -> String {
        self.query(name).unwrap_or_else(|| default.to_string())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.req.param(name).filter(|value| !value.is_empty())
    }

    pub fn param_or(&self, name: &str, default: &str) -> String {
        self.param(name).unwrap_or(default).to_string()
    }

    /// Record the response status. Chainable.
    pub fn status(&mut self, code: impl Into<u16>) -> &mut Self {
        self.res.status(code);
        self
    }

    pub fn send_status(&mut self, code: impl Into<u16>) -> Result {
        self.res.send_status(code)
    }

    pub fn send(&mut self, data: impl AsRef<[u8]>) -> Result {
        self.res.send(data)
    }

    pub fn send_string(&mut self, s: impl AsRef<str>) -> Result {
        self.res.send(s.as_ref())
    }

    /// Send a file from disk, typed by its extension.
    pub fn send_file(&mut self, path: impl AsRef<Path>) -> Result {
        let path = path.as_ref();
        let contents = std::fs::read(path)?;
        if !self.res.headers().contains_key(header::CONTENT_TYPE) {
            let extension = path.extension().and_then(|ext| ext.to_str());
            self.res
                .set_header("content-type", content_type_for_extension(extension))?;
        }
        self.res.send(contents)
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> Result {
        self.res.json(data)
    }
}

async fn read_form_file(body: Bytes, boundary: String, key: &str) -> Result<FormFile> {
    let body = stream::once(std::future::ready(Ok::<_, Infallible>(body)));
    let mut multipart = Multipart::new(body, boundary);
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(key) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(|mime| mime.to_string());
        let data = field.bytes().await?;
        return Ok(FormFile {
            file_name,
            content_type,
            data,
        });
    }
    Err(Error::MissingFile { key: key.to_string() })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use axum::http::{self, StatusCode};
    use serde::Deserialize;

    use super::*;
    use crate::error::Error;

    fn request(uri: &str, headers: &[(&str, &str)], body: &'static [u8]) -> Request {
        let mut builder = http::Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        Request::new(builder.body(Bytes::from_static(body)).unwrap())
    }

    #[derive(Debug, Default, PartialEq)]
    struct AccountPath {
        name: String,
        id: u32,
    }

    crate::params!(AccountPath { name, id => "account_id" });

    #[test]
    fn test_params_parser() {
        let req = request("/account/7/Ann%20Lee", &[], b"").with_route(
            "/account/{account_id}/:name",
            vec![
                ("account_id".into(), "7".into()),
                ("name".into(), "Ann Lee".into()),
            ],
        );
        let mut res = Response::new();
        let c = Context::new(&req, &mut res);
        let mut path = AccountPath::default();
        c.params_parser(&mut path).unwrap();
        assert_eq!(
            path,
            AccountPath {
                name: "Ann Lee".into(),
                id: 7
            }
        );
    }

    #[test]
    fn test_params_parser_coercion_error() {
        let req = request("/account/x/y", &[], b"")
            .with_route("/account/:account_id/:name", vec![("account_id".into(), "x".into())]);
        let mut res = Response::new();
        let c = Context::new(&req, &mut res);
        let err = c.params_parser(&mut AccountPath::default()).unwrap_err();
        assert!(matches!(err, Error::Param(_)));
        assert_eq!(err.to_string(), "cannot convert 'x' to u32");
    }

    #[test]
    fn test_body_and_query_parsers() {
        #[derive(Deserialize)]
        struct Body {
            name: String,
        }
        #[derive(Deserialize)]
        struct Search {
            q: String,
            page: Option<String>,
        }

        let req = request("/?q=gopher&q=ignored", &[], br#"{"name":"Ann"}"#);
        let mut res = Response::new();
        let c = Context::new(&req, &mut res);

        let body: Body = c.body_parser().unwrap();
        assert_eq!(body.name, "Ann");

        let search: Search = c.query_parser().unwrap();
        assert_eq!(search.q, "gopher");
        assert_eq!(search.page, None);
    }

    #[test]
    fn test_header_parser_and_ip() {
        let req = request(
            "/",
            &[("X-Forwarded-For", "10.0.0.1, 10.0.0.2"), ("User-Agent", "tests")],
            b"",
        );
        let mut res = Response::new();
        let c = Context::new(&req, &mut res);

        let headers: HashMap<String, String> = c.req_header_parser().unwrap();
        assert_eq!(headers["user-agent"], "tests");

        assert_eq!(c.ip(), "10.0.0.1, 10.0.0.2");
        assert_eq!(c.ips(), vec!["10.0.0.1", "10.0.0.2"]);

        let req = request("/", &[("X-Real-IP", "192.168.1.9")], b"");
        let mut res = Response::new();
        let c = Context::new(&req, &mut res);
        assert_eq!(c.ip(), "192.168.1.9");
        assert_eq!(c.ips(), vec!["192.168.1.9"]);
    }

    #[test]
    fn test_defaults() {
        let req = request("/?empty=", &[], b"");
        let mut res = Response::new();
        let c = Context::new(&req, &mut res);
        assert_eq!(c.query_or("empty", "fallback"), "fallback");
        assert_eq!(c.query_or("missing", "fallback"), "fallback");
        assert_eq!(c.param_or("name", "anon"), "anon");
    }

    #[test]
    fn test_status_chain_and_json() {
        let req = request("/", &[], b"");
        let mut res = Response::new();
        let mut c = Context::new(&req, &mut res);
        c.status(StatusCode::CREATED)
            .json(&crate::json::Json::new().with("created", true))
            .unwrap();
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.body(), br#"{"created":true}"#);
    }

    #[test]
    fn test_send_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"ok":true}"#).unwrap();

        let req = request("/", &[], b"");
        let mut res = Response::new();
        let mut c = Context::new(&req, &mut res);
        c.send_file(file.path()).unwrap();
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(res.body(), br#"{"ok":true}"#);

        let mut res = Response::new();
        let mut c = Context::new(&req, &mut res);
        assert!(matches!(c.send_file("/definitely/not/here"), Err(Error::Io(_))));
    }

    const UPLOAD: &[u8] = b"--XBOUNDARY\r\n\
Content-Disposition: form-data; name=\"note\"\r\n\
\r\n\
hello\r\n\
--XBOUNDARY\r\n\
Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
Content-Type: image/png\r\n\
\r\n\
\x89PNG bytes\r\n\
--XBOUNDARY--\r\n";

    #[test]
    fn test_form_file() {
        let headers = [("content-type", "multipart/form-data; boundary=XBOUNDARY")];
        let req = request("/upload", &headers, UPLOAD);
        let mut res = Response::new();
        let c = Context::new(&req, &mut res);

        let file = c.form_file("avatar").unwrap();
        assert_eq!(file.file_name, "me.png");
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        assert_eq!(file.data.as_ref(), b"\x89PNG bytes");

        assert!(matches!(c.form_file("note"), Err(Error::MissingFile { key }) if key == "note"));
        assert!(matches!(c.form_file("absent"), Err(Error::MissingFile { .. })));
    }

    #[test]
    fn test_form_file_requires_multipart() {
        let req = request("/upload", &[("content-type", "application/json")], b"{}");
        let mut res = Response::new();
        let c = Context::new(&req, &mut res);
        assert!(matches!(c.form_file("avatar"), Err(Error::Multipart(_))));

        let req = request("/upload", &[], b"");
        let mut res = Response::new();
        let c = Context::new(&req, &mut res);
        assert!(matches!(c.form_file("avatar"), Err(Error::Multipart(_))));
    }
}
