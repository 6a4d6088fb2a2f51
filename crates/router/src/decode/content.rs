//! Chooses a decoding strategy from the request's declared content type.

use bytes::Bytes;
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use http_body_util::BodyExt;
use mime::Mime;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::body::ReqBody;
use crate::decode::document::{decode_json, decode_xml};
use crate::decode::{Decode, DecodeError, FORM_TAG, FormValues, QUERY_TAG, decode, ensure_record};

/// The body formats [`decode_body`] understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Xml,
    UrlEncoded,
    Multipart,
    /// Anything else, holding the declared media type (empty when none was sent).
    Other(String),
}

impl ContentKind {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()) else {
            return ContentKind::Other(String::new());
        };

        match value.parse::<Mime>() {
            Ok(mime) => ContentKind::from_mime(&mime),
            Err(_) => ContentKind::Other(value.to_owned()),
        }
    }

    pub fn from_mime(mime: &Mime) -> Self {
        let (top, sub) = (mime.type_(), mime.subtype());
        if top == mime::APPLICATION && sub == mime::JSON {
            ContentKind::Json
        } else if (top == mime::APPLICATION || top == mime::TEXT) && sub == mime::XML {
            ContentKind::Xml
        } else if top == mime::APPLICATION && sub == mime::WWW_FORM_URLENCODED {
            ContentKind::UrlEncoded
        } else if top == mime::MULTIPART && sub == mime::FORM_DATA {
            ContentKind::Multipart
        } else {
            ContentKind::Other(mime.essence_str().to_owned())
        }
    }
}

/// Decodes the request body into `dest` according to its content type.
///
/// JSON and XML bodies are deserialized with serde over the current contents of `dest`:
/// fields the document leaves out keep their values and no field is required. Key names
/// follow serde's attributes for these two. As with any serde XML decode, a list field that
/// may be absent from the document needs `#[serde(default)]`.
///
/// Url encoded and multipart bodies become [`FormValues`], drop blank single values, and are
/// decoded with the `form` tag. Multipart file parts are left out; [`MultipartForm`], which
/// is also an extractor, keeps them.
pub async fn decode_body<T>(req: &mut http::Request<ReqBody>, dest: &mut T) -> Result<(), DecodeError>
where
    T: Decode + Serialize + DeserializeOwned,
{
    ensure_record::<T>()?;

    match ContentKind::from_headers(req.headers()) {
        ContentKind::Json => {
            let bytes = req.body_mut().bytes().await.map_err(DecodeError::invalid_body)?;
            decode_json(&bytes, dest)
        }
        ContentKind::Xml => {
            let bytes = req.body_mut().bytes().await.map_err(DecodeError::invalid_body)?;
            decode_xml(&bytes, dest)
        }
        ContentKind::UrlEncoded => {
            let bytes = req.body_mut().bytes().await.map_err(DecodeError::invalid_body)?;
            let mut values = parse_urlencoded(&bytes)?;
            values.remove_blank();
            decode(&values, dest, FORM_TAG)
        }
        ContentKind::Multipart => {
            let boundary = multipart_boundary(req.headers())?;
            let mut values = parse_multipart(req.body_mut(), boundary).await?;
            values.remove_blank();
            decode(&values, dest, FORM_TAG)
        }
        ContentKind::Other(content_type) => {
            debug!(content_type = %content_type, "no body decoder for content type");
            Err(DecodeError::InvalidContentType { content_type })
        }
    }
}

/// Decodes the request's query string into `dest` using the `query` tag.
///
/// Empty values are kept, so `?name=` assigns nothing but still satisfies `required`.
pub fn decode_query<T: Decode, B>(req: &http::Request<B>, dest: &mut T) -> Result<(), DecodeError> {
    let values = parse_urlencoded(req.uri().query().unwrap_or_default().as_bytes())?;
    decode(&values, dest, QUERY_TAG)
}

pub fn parse_urlencoded(input: &[u8]) -> Result<FormValues, DecodeError> {
    let pairs = serde_urlencoded::from_bytes::<Vec<(String, String)>>(input).map_err(DecodeError::invalid_body)?;
    Ok(pairs.into_iter().collect())
}

/// Reads the text parts of a multipart body, skipping parts that carry a file name.
pub async fn parse_multipart(body: &mut ReqBody, boundary: String) -> Result<FormValues, DecodeError> {
    parse_multipart_form(body, boundary, false).await.map(|form| form.values)
}

/// Reads a whole multipart body, text parts and uploaded files.
pub async fn parse_multipart_files(body: &mut ReqBody, boundary: String) -> Result<MultipartForm, DecodeError> {
    parse_multipart_form(body, boundary, true).await
}

async fn parse_multipart_form(body: &mut ReqBody, boundary: String, keep_files: bool) -> Result<MultipartForm, DecodeError> {
    let stream = body.take().map_err(DecodeError::invalid_body)?.into_data_stream();
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut form = MultipartForm::default();
    while let Some(field) = multipart.next_field().await.map_err(DecodeError::invalid_body)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if let Some(file_name) = field.file_name().map(str::to_owned) {
            if !keep_files {
                continue;
            }
            let content_type = field.content_type().cloned();
            let data = field.bytes().await.map_err(DecodeError::invalid_body)?;
            debug!(field = %name, file_name = %file_name, size = data.len(), "multipart file received");
            form.files.push(FormFile { field: name, file_name, content_type, data });
        } else {
            let text = field.text().await.map_err(DecodeError::invalid_body)?;
            form.values.append(name, text);
        }
    }
    Ok(form)
}

/// The boundary of a `multipart/form-data` request.
pub(crate) fn multipart_boundary(headers: &HeaderMap) -> Result<String, DecodeError> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| DecodeError::invalid_body("missing multipart content type"))
        .and_then(|value| multer::parse_boundary(value).map_err(DecodeError::invalid_body))
}

/// A parsed `multipart/form-data` body: its text values and its uploaded files.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    values: FormValues,
    files: Vec<FormFile>,
}

impl MultipartForm {
    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn files(&self) -> &[FormFile] {
        &self.files
    }

    /// The first file uploaded under `field`.
    pub fn file(&self, field: &str) -> Option<&FormFile> {
        self.files.iter().find(|file| file.field == field)
    }

    /// Every file uploaded under `field`, in upload order.
    pub fn files_of<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FormFile> + 'a {
        self.files.iter().filter(move |file| file.field == field)
    }

    /// Decodes the text values into `dest` with the `form` tag, the same way
    /// [`decode_body`] treats a multipart body.
    pub fn decode<T: Decode>(&self, dest: &mut T) -> Result<(), DecodeError> {
        let mut values = self.values.clone();
        values.remove_blank();
        decode(&values, dest, FORM_TAG)
    }

    pub fn into_files(self) -> Vec<FormFile> {
        self.files
    }
}

/// One uploaded file of a multipart body.
#[derive(Debug, Clone)]
pub struct FormFile {
    field: String,
    file_name: String,
    content_type: Option<Mime>,
    data: Bytes,
}

impl FormFile {
    /// The form field the file was sent under.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The file name as sent by the client; it is not sanitized.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::header::CONTENT_TYPE;
    use http_body_util::Full;
    use serde::{Deserialize, Serialize};

    use crate::body::ReqBody;
    use crate::decode::content::multipart_boundary;
    use crate::decode::{ContentKind, Decode, DecodeErrorKind, decode_body, decode_query, parse_multipart_files};

    #[derive(Debug, Default, Decode, Serialize, Deserialize, PartialEq)]
    struct Signup {
        #[form = "name,required"]
        name: String,
        #[serde(default)]
        age: u32,
        #[serde(default)]
        tags: Vec<String>,
    }

    fn request(content_type: &str, body: &'static str) -> http::Request<ReqBody> {
        http::Request::builder()
            .method("POST")
            .uri("/signup")
            .header(CONTENT_TYPE, content_type)
            .body(ReqBody::new(Full::new(Bytes::from_static(body.as_bytes()))))
            .unwrap()
    }

    #[test]
    fn content_kinds() {
        let kind = |value: &str| {
            let mut headers = http::HeaderMap::new();
            headers.insert(CONTENT_TYPE, value.parse().unwrap());
            ContentKind::from_headers(&headers)
        };

        assert_eq!(kind("application/json; charset=utf-8"), ContentKind::Json);
        assert_eq!(kind("text/xml"), ContentKind::Xml);
        assert_eq!(kind("application/xml"), ContentKind::Xml);
        assert_eq!(kind("application/x-www-form-urlencoded"), ContentKind::UrlEncoded);
        assert_eq!(kind("multipart/form-data; boundary=abc"), ContentKind::Multipart);
        assert_eq!(kind("text/plain"), ContentKind::Other("text/plain".into()));
        assert_eq!(ContentKind::from_headers(&http::HeaderMap::new()), ContentKind::Other(String::new()));
    }

    #[tokio::test]
    async fn urlencoded_body() {
        let mut req = request("application/x-www-form-urlencoded", "name=Jane&age=&tags=a&tags=b");
        let mut signup = Signup { age: 3, ..Signup::default() };
        decode_body(&mut req, &mut signup).await.unwrap();

        assert_eq!(signup, Signup { name: "Jane".into(), age: 3, tags: vec!["a".into(), "b".into()] });
    }

    #[tokio::test]
    async fn blank_required_form_value_is_missing() {
        let mut req = request("application/x-www-form-urlencoded", "name=&age=4");
        let err = decode_body(&mut req, &mut Signup::default()).await.unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::RequiredFieldMissing);
    }

    #[tokio::test]
    async fn json_body_merges_into_dest() {
        let mut req = request("application/json", r#"{"name":"Jane","age":30}"#);
        let mut signup = Signup { tags: vec!["old".into()], ..Signup::default() };
        decode_body(&mut req, &mut signup).await.unwrap();

        assert_eq!(signup, Signup { name: "Jane".into(), age: 30, tags: vec!["old".into()] });
    }

    #[tokio::test]
    async fn json_body_does_not_enforce_required() {
        let mut req = request("application/json", r#"{"age":5}"#);
        let mut signup = Signup { name: "keep".into(), ..Signup::default() };
        decode_body(&mut req, &mut signup).await.unwrap();

        assert_eq!(signup, Signup { name: "keep".into(), age: 5, tags: vec![] });
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error() {
        let mut req = request("application/json", r#"{"name":"#);
        let err = decode_body(&mut req, &mut Signup::default()).await.unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::ParseError);
    }

    #[tokio::test]
    async fn xml_body() {
        let mut req = request("application/xml", "<signup><name>Jane</name><age>7</age></signup>");
        let mut signup = Signup::default();
        decode_body(&mut req, &mut signup).await.unwrap();

        assert_eq!(signup.name, "Jane");
        assert_eq!(signup.age, 7);
    }

    #[tokio::test]
    async fn partial_xml_body_keeps_current_values() {
        let mut req = request("text/xml", "<signup><age>8</age></signup>");
        let mut signup = Signup { name: "keep".into(), age: 1, tags: vec!["t".into()] };
        decode_body(&mut req, &mut signup).await.unwrap();

        assert_eq!(signup, Signup { name: "keep".into(), age: 8, tags: vec!["t".into()] });
    }

    #[tokio::test]
    async fn multipart_body_skips_files() {
        let body = concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"name\"\r\n\r\n",
            "Jane\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"tags\"; filename=\"tags.txt\"\r\n",
            "Content-Type: text/plain\r\n\r\n",
            "ignored\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"age\"\r\n\r\n",
            "12\r\n",
            "--XYZ--\r\n",
        );
        let mut req = request("multipart/form-data; boundary=XYZ", body);
        let mut signup = Signup::default();
        decode_body(&mut req, &mut signup).await.unwrap();

        assert_eq!(signup, Signup { name: "Jane".into(), age: 12, tags: vec![] });
    }

    #[tokio::test]
    async fn multipart_files_are_kept_on_request() {
        let body = concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"name\"\r\n\r\n",
            "Jane\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n",
            "Content-Type: image/png\r\n\r\n",
            "PNGDATA\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"docs\"; filename=\"a.txt\"\r\n\r\n",
            "first\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"docs\"; filename=\"b.txt\"\r\n\r\n",
            "second\r\n",
            "--XYZ--\r\n",
        );
        let mut req = request("multipart/form-data; boundary=XYZ", body);
        let boundary = multipart_boundary(req.headers()).unwrap();
        let form = parse_multipart_files(req.body_mut(), boundary).await.unwrap();

        assert_eq!(form.files().len(), 3);
        let avatar = form.file("avatar").unwrap();
        assert_eq!(avatar.file_name(), "me.png");
        assert_eq!(avatar.content_type(), Some(&mime::IMAGE_PNG));
        assert_eq!(avatar.data().as_ref(), b"PNGDATA");

        let docs: Vec<_> = form.files_of("docs").map(|file| file.file_name()).collect();
        assert_eq!(docs, ["a.txt", "b.txt"]);
        assert!(form.file("missing").is_none());

        let mut signup = Signup::default();
        form.decode(&mut signup).unwrap();
        assert_eq!(signup.name, "Jane");
        assert!(!form.values().contains_key("avatar"));
    }

    #[tokio::test]
    async fn unknown_content_type() {
        let mut req = request("text/plain", "name=Jane");
        let err = decode_body(&mut req, &mut Signup::default()).await.unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::InvalidContentType);
    }

    #[tokio::test]
    async fn consumed_body_is_parse_error() {
        let mut req = request("application/json", r#"{"name":"Jane"}"#);
        req.body_mut().bytes().await.unwrap();

        let err = decode_body(&mut req, &mut Signup::default()).await.unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::ParseError);
    }

    #[test]
    fn query_keeps_empty_values() {
        let req = http::Request::builder().uri("/signup?name=&age=5&tags=a,%20b").body(()).unwrap();
        let mut signup = Signup { name: "keep".into(), ..Signup::default() };
        decode_query(&req, &mut signup).unwrap();

        assert_eq!(signup, Signup { name: "keep".into(), age: 5, tags: vec!["a".into(), "b".into()] });
    }
}
