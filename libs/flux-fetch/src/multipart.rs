//! `multipart/form-data` and urlencoded form bodies.

use crate::body::{FormData, FormValue};
use crate::error::FetchError;
use bytes::Bytes;
use rand::Rng;

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Parse a form body according to its content type.
///
/// Accepts `multipart/form-data` (the boundary must be given as a
/// parameter) and `application/x-www-form-urlencoded`.
///
/// # Errors
/// Returns `FetchError::InvalidFormData` for other content types, a missing
/// boundary, or a body that does not follow the multipart framing.
pub fn parse_form_data(content_type: &str, body: &[u8]) -> Result<FormData, FetchError> {
    let mime: mime::Mime = content_type
        .parse()
        .map_err(|_| FetchError::InvalidFormData(format!("invalid content type '{content_type}'")))?;

    if mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
        return parse_urlencoded(body);
    }

    if mime.type_() != mime::MULTIPART || mime.subtype() != mime::FORM_DATA {
        return Err(FetchError::InvalidFormData(format!(
            "content type '{}' is not a form",
            mime.essence_str()
        )));
    }

    let boundary = mime
        .get_param(mime::BOUNDARY)
        .ok_or_else(|| FetchError::InvalidFormData("missing multipart boundary".to_owned()))?;

    parse_multipart(boundary.as_str().trim_matches('"'), body)
}

fn parse_urlencoded(body: &[u8]) -> Result<FormData, FetchError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| FetchError::InvalidFormData(e.to_string()))?;

    let mut form = FormData::new();
    for (name, value) in pairs {
        form.append_text(name, value);
    }
    Ok(form)
}

fn parse_multipart(boundary: &str, body: &[u8]) -> Result<FormData, FetchError> {
    let delimiter = [b"--".as_slice(), boundary.as_bytes()].concat();
    let next_delimiter = [CRLF, delimiter.as_slice()].concat();

    let mut pos = find(body, &delimiter, 0)
        .ok_or_else(|| FetchError::InvalidFormData("opening boundary not found".to_owned()))?
        + delimiter.len();

    let mut form = FormData::new();
    loop {
        if body[pos..].starts_with(b"--") {
            return Ok(form);
        }
        if !body[pos..].starts_with(CRLF) {
            return Err(FetchError::InvalidFormData(
                "boundary not followed by a line break".to_owned(),
            ));
        }
        pos += CRLF.len();

        let end = find(body, &next_delimiter, pos)
            .ok_or_else(|| FetchError::InvalidFormData("closing boundary not found".to_owned()))?;
        let (name, value) = parse_part(&body[pos..end])?;
        form.append(name, value);

        pos = end + next_delimiter.len();
    }
}

fn parse_part(part: &[u8]) -> Result<(String, FormValue), FetchError> {
    let split = find(part, HEADER_END, 0)
        .ok_or_else(|| FetchError::InvalidFormData("part has no header block".to_owned()))?;
    let header_block = String::from_utf8_lossy(&part[..split]);
    let content = &part[split + HEADER_END.len()..];

    let mut name = None;
    let mut file_name = None;
    let mut content_type = None;

    for line in header_block.split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if header.trim().eq_ignore_ascii_case("content-disposition") {
            for (key, param) in disposition_params(value) {
                match key.to_ascii_lowercase().as_str() {
                    "name" => name = Some(unescape_field(&param)),
                    "filename" => file_name = Some(unescape_field(&param)),
                    _ => {}
                }
            }
        } else if header.trim().eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_owned());
        }
    }

    let name = name.ok_or_else(|| {
        FetchError::InvalidFormData("part is missing a content-disposition name".to_owned())
    })?;

    let value = if file_name.is_some() || content_type.is_some() {
        FormValue::File {
            file_name,
            content_type,
            data: Bytes::copy_from_slice(content),
        }
    } else {
        FormValue::Text(String::from_utf8_lossy(content).into_owned())
    };

    Ok((name, value))
}

/// Split the `key=value` parameters that follow the disposition type.
///
/// Values may be quoted strings, which can hold `;` and backslash escapes.
fn disposition_params(value: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = value.chars().peekable();

    // Skip the disposition type itself
    for c in chars.by_ref() {
        if c == ';' {
            break;
        }
    }

    loop {
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ';' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if chars.next_if_eq(&'=').is_none() {
            // Parameter without a value, or end of input
            if chars.next().is_none() {
                break;
            }
            continue;
        }

        while chars.next_if(|c| c.is_ascii_whitespace()).is_some() {}

        let mut param = String::new();
        if chars.next_if_eq(&'"').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            param.push(escaped);
                        }
                    }
                    _ => param.push(c),
                }
            }
            // Drop anything between the closing quote and the next parameter
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
            }
        } else {
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
                param.push(c);
            }
            param = param.trim_end().to_owned();
        }

        params.push((key.trim().to_owned(), param));
        if chars.peek().is_none() {
            break;
        }
    }

    params
}

/// Escape a field or file name for a quoted `Content-Disposition` parameter
fn escape_field(name: &str) -> String {
    name.replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Undo [`escape_field`]
fn unescape_field(name: &str) -> String {
    name.replace("%22", "\"")
        .replace("%0D", "\r")
        .replace("%0A", "\n")
}

/// Encode `form` as a multipart body delimited by `boundary`
#[must_use]
pub fn encode_multipart(form: &FormData, boundary: &str) -> Bytes {
    let mut out = Vec::new();
    for (name, value) in form.iter() {
        let name = escape_field(name);
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match value {
            FormValue::Text(text) => {
                out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                out.extend_from_slice(text.as_bytes());
            }
            FormValue::File {
                file_name,
                content_type,
                data,
            } => {
                let file_name = escape_field(file_name.as_deref().unwrap_or("blob"));
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
                    )
                    .as_bytes(),
                );
                let content_type = content_type
                    .as_deref()
                    .unwrap_or("application/octet-stream");
                out.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
                out.extend_from_slice(data);
            }
        }
        out.extend_from_slice(CRLF);
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Bytes::from(out)
}

/// Encode the text fields of `form` as `application/x-www-form-urlencoded`
///
/// # Errors
/// Returns `FetchError::InvalidFormData` if encoding fails.
pub fn encode_urlencoded(form: &FormData) -> Result<Bytes, FetchError> {
    serde_urlencoded::to_string(form.text_pairs())
        .map(Bytes::from)
        .map_err(|e| FetchError::InvalidFormData(e.to_string()))
}

/// Fresh boundary for an outgoing multipart body
#[must_use]
pub fn generate_boundary() -> String {
    let mut rng = rand::rng();
    format!("----flux-fetch-{:016x}{:016x}", rng.random::<u64>(), rng.random::<u64>())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| offset + from)
}
