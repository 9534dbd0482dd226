use uuid::Uuid;

/// A single binary section of a `multipart/form-data` body, such as an image
/// attached to a tweet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    /// Field name, e.g. `media[]`
    pub name: String,
    /// MIME type of the payload, e.g. `image/png`
    pub mime_type: String,
    /// Raw payload bytes
    pub data: Vec<u8>,
}

impl MediaPart {
    /// Create a new part from payload bytes, a field name and a MIME type
    pub fn new(
        data: impl Into<Vec<u8>>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        MediaPart {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// An encoded `multipart/form-data` request body together with the boundary
/// it was delimited with and the matching `Content-Type` header value.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub body: Vec<u8>,
    pub boundary: String,
    pub content_type: String,
}

/// Generate a boundary token that will not collide with any payload byte
/// sequence except with negligible probability.
pub fn random_boundary() -> String {
    format!("tw{}", Uuid::new_v4().simple())
}

/// Encode text parameters and binary parts into a `multipart/form-data` body
/// with a freshly generated boundary.
///
/// Parts are emitted in the order supplied by the caller.
pub fn encode<'a, I>(parameters: I, parts: &[MediaPart]) -> MultipartBody
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    encode_with_boundary(parameters, parts, &random_boundary())
}

/// Encode with a caller-chosen boundary. Output is fully deterministic for a
/// fixed boundary.
pub fn encode_with_boundary<'a, I>(
    parameters: I,
    parts: &[MediaPart],
    boundary: &str,
) -> MultipartBody
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut body = Vec::new();

    for (name, value) in parameters {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n",
                part.name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.mime_type).as_bytes());
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    MultipartBody {
        body,
        boundary: boundary.to_string(),
        content_type: format!("multipart/form-data; boundary={}", boundary),
    }
}
