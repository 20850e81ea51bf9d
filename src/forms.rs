// src/forms.rs
//
// Multipart bodies are read fully into memory: text parts become fields,
// parts with a filename become file buffers.

use std::collections::HashMap;
use std::str::FromStr;

use actix_multipart::Multipart;
use futures_util::TryStreamExt;
use log::debug;
use mongodb::bson::oid::ObjectId;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};
use crate::models::{decode_list, parse_ref};

#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<Vec<u8>>>,
}

impl Form {
    /// Reads the whole body; more than `limit` bytes is a validation error.
    pub async fn read(mut payload: Multipart, limit: usize) -> ApiResult<Self> {
        let mut form = Form::default();
        let mut total = 0usize;

        while let Some(mut field) = payload.try_next().await.map_err(bad_body)? {
            let name = field.name().unwrap_or_default().to_string();
            let is_file = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .is_some();

            let mut buf = Vec::new();
            while let Some(chunk) = field.try_next().await.map_err(bad_body)? {
                total += chunk.len();
                if total > limit {
                    return Err(ApiError::validation(format!(
                        "Upload exceeds the limit of {} bytes",
                        limit
                    )));
                }
                buf.extend_from_slice(&chunk);
            }

            if name.is_empty() {
                continue;
            }
            if is_file {
                if !buf.is_empty() {
                    form.files.entry(name).or_default().push(buf);
                }
            } else {
                let text = String::from_utf8(buf).map_err(|_| {
                    ApiError::validation(format!("Field '{}' is not valid UTF-8", name))
                })?;
                form.fields.insert(name, text);
            }
        }

        debug!(
            "Read multipart form: fields={:?} files={:?}",
            form.fields.keys().collect::<Vec<_>>(),
            form.files.iter().map(|(k, v)| (k, v.len())).collect::<Vec<_>>()
        );
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed text; blank counts as absent.
    pub fn value(&self, name: &str) -> Option<String> {
        self.text(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn required(&self, name: &str) -> ApiResult<String> {
        self.value(name)
            .ok_or_else(|| ApiError::validation(format!("Field '{}' is required", name)))
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> ApiResult<Option<T>> {
        match self.value(name) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::validation(format!("Field '{}' is invalid", name))),
        }
    }

    /// A list sent as JSON text. `None` when the field was not sent.
    pub fn list<T: DeserializeOwned>(&self, name: &str) -> ApiResult<Option<Vec<T>>> {
        self.text(name).map(|raw| decode_list(raw, name)).transpose()
    }

    /// `None` when not sent, `Some(None)` when sent blank (clears the reference).
    pub fn reference(&self, name: &str) -> ApiResult<Option<Option<ObjectId>>> {
        self.text(name).map(|raw| parse_ref(Some(raw))).transpose()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.get_mut(name).and_then(|files| {
            if files.is_empty() {
                None
            } else {
                Some(files.remove(0))
            }
        })
    }

    pub fn take_files(&mut self, name: &str) -> Vec<Vec<u8>> {
        self.files.remove(name).unwrap_or_default()
    }
}

fn bad_body(err: actix_multipart::MultipartError) -> ApiError {
    ApiError::validation(format!("Malformed multipart body: {}", err))
}

#[cfg(test)]
pub mod testing {
    use actix_web::test::TestRequest;

    const BOUNDARY: &str = "----projectsdayboundary";

    /// Builds a multipart request from text fields and `(name, bytes)` files.
    pub fn multipart(req: TestRequest, fields: &[(&str, &str)], files: &[(&str, &[u8])]) -> TestRequest {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (i, (name, bytes)) in files.iter().enumerate() {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"f{i}.png\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        req.insert_header((
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
    }
}
