//! Google Drive adapter. Unlike the other two services this one needs a
//! real OAuth2 authorization-code flow: a consent screen in the user's
//! browser, a short-lived local callback listener to catch the code,
//! and a token exchange. The refresh token from that first run is kept
//! in config so later invocations only do a silent token refresh.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{future, stream, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::common::config::ConfigStore;
use crate::common::errors::{Result, UpdropError};
use crate::services::{error_from_response, ServiceAdapter, UploadOutcome};
use crate::upload::UploadJob;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const UPLOAD_ENDPOINT: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart";
const FILES_ENDPOINT: &str = "https://www.googleapis.com/drive/v3/files";

/// Only files this tool created, not the whole Drive.
const SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

pub struct GoogleDrive {
    client: Client,
    access_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

impl GoogleDrive {
    /// Get an access token, running the interactive flow only when no
    /// refresh token is stored yet. A freshly minted refresh token is
    /// written back to the config store.
    pub async fn connect(client: Client, store: &ConfigStore) -> Result<Self> {
        let config = store.load()?;
        let gd = config.google_drive.clone();
        let (client_id, client_secret) = match (gd.client_id, gd.client_secret) {
            (Some(id), Some(secret)) => (id, secret),
            _ => {
                return Err(UpdropError::MissingCredentials {
                    service: "google-drive",
                    hint: "set the OAuth client id/secret with `updrop config`",
                })
            }
        };

        let access_token = match gd.refresh_token {
            Some(refresh_token) => {
                refresh_access_token(&client, &client_id, &client_secret, &refresh_token).await?
            }
            None => {
                let tokens = authorize(&client, &client_id, &client_secret).await?;
                if let Some(refresh) = &tokens.refresh_token {
                    let refresh = refresh.clone();
                    store.update(move |c| c.google_drive.refresh_token = Some(refresh))?;
                }
                tokens.access_token
            }
        };

        Ok(Self {
            client,
            access_token,
        })
    }

    /// Separate permissions call to make the file link-shareable by
    /// anyone holding the URL.
    async fn share_with_anyone(&self, file_id: &str) -> Result<()> {
        let res = self
            .client
            .post(format!("{FILES_ENDPOINT}/{file_id}/permissions"))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(error_from_response("google-drive", res).await);
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceAdapter for GoogleDrive {
    fn name(&self) -> &'static str {
        "google-drive"
    }

    async fn upload(&self, job: &UploadJob) -> Result<UploadOutcome> {
        // multipart/related body: JSON metadata part, then the media
        // part streamed straight from the counted file stream
        let boundary = format!("updrop{}", Uuid::new_v4().simple());
        let metadata = serde_json::json!({ "name": job.file_name }).to_string();
        let head = multipart_head(&boundary, &metadata);
        let tail = multipart_tail(&boundary);
        let content_length = head.len() as u64 + job.file_size + tail.len() as u64;

        let body_stream = stream::once(future::ready(Ok::<Bytes, std::io::Error>(Bytes::from(
            head,
        ))))
        .chain(job.stream().await?)
        .chain(stream::once(future::ready(Ok(Bytes::from(tail)))));

        let res = self
            .client
            .post(UPLOAD_ENDPOINT)
            .bearer_auth(&self.access_token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .header(CONTENT_LENGTH, content_length)
            .body(reqwest::Body::wrap_stream(body_stream))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(error_from_response("google-drive", res).await);
        }

        let file: DriveFile = res.json().await?;
        self.share_with_anyone(&file.id).await?;

        let link = view_link(&file.id);
        Ok(UploadOutcome {
            file_id: file.id,
            link,
        })
    }
}

fn multipart_head(boundary: &str, metadata_json: &str) -> String {
    format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n\
         {metadata_json}\r\n--{boundary}\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
}

fn multipart_tail(boundary: &str) -> String {
    format!("\r\n--{boundary}--\r\n")
}

pub fn view_link(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{file_id}/view?usp=sharing")
}

/// Consent URL for the authorization-code flow. `access_type=offline`
/// plus `prompt=consent` is what makes Google hand out a refresh token.
fn authorize_url(client_id: &str, redirect_uri: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", SCOPE)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .finish();
    format!("{AUTH_ENDPOINT}?{query}")
}

/// Full interactive flow: consent URL in the browser, one callback on a
/// loopback listener, then the code-for-tokens exchange.
async fn authorize(client: &Client, client_id: &str, client_secret: &str) -> Result<TokenResponse> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());

    let consent_url = authorize_url(client_id, &redirect_uri);
    println!("Authorize updrop in your browser:\n\n  {consent_url}\n");
    if webbrowser::open(&consent_url).is_err() {
        tracing::warn!("could not open a browser, follow the URL above manually");
    }

    let code = wait_for_code(listener).await?;
    exchange_code(client, client_id, client_secret, &code, &redirect_uri).await
}

/// Accept exactly one connection and pull the `code` out of the request
/// line. The listener dies with this function; it never serves twice.
async fn wait_for_code(listener: TcpListener) -> Result<String> {
    let (mut socket, _) = listener.accept().await?;

    let mut buf = vec![0u8; 4096];
    let n = socket.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);
    let code = parse_auth_code(request.lines().next().unwrap_or_default());

    let (status, message) = match &code {
        Some(_) => ("200 OK", "Authorization complete. You can close this tab."),
        None => ("400 Bad Request", "Authorization failed or was denied."),
    };
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
         <html><body><p>{message}</p></body></html>"
    );
    socket.write_all(response.as_bytes()).await?;
    let _ = socket.shutdown().await;

    code.ok_or_else(|| UpdropError::Auth("no authorization code in the callback".to_string()))
}

/// Parses `GET /?code=...&scope=... HTTP/1.1` from the redirect.
fn parse_auth_code(request_line: &str) -> Option<String> {
    let target = request_line.split_whitespace().nth(1)?;
    let query = target.split_once('?')?.1;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
}

async fn exchange_code(
    client: &Client,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse> {
    let res = client
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;

    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(UpdropError::Auth(format!(
            "token exchange failed: {status}: {body}"
        )));
    }
    Ok(res.json().await?)
}

/// Trade the stored refresh token for a short-lived access token.
async fn refresh_access_token(
    client: &Client,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<String> {
    let res = client
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(UpdropError::Auth(format!(
            "token refresh failed ({status}: {body}); re-run `updrop config` to authorize again"
        )));
    }
    let tokens: TokenResponse = res.json().await?;
    Ok(tokens.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_code_is_parsed_from_request_line() {
        let code = parse_auth_code("GET /?code=4%2FabcDEF&scope=drive.file HTTP/1.1");
        // percent-decoded
        assert_eq!(code.as_deref(), Some("4/abcDEF"));
    }

    #[test]
    fn denied_consent_has_no_code() {
        assert!(parse_auth_code("GET /?error=access_denied HTTP/1.1").is_none());
    }

    #[test]
    fn garbage_request_line_has_no_code() {
        assert!(parse_auth_code("").is_none());
        assert!(parse_auth_code("GET / HTTP/1.1").is_none());
    }

    #[test]
    fn authorize_url_carries_offline_consent_params() {
        let url = authorize_url("my-client", "http://127.0.0.1:9999");
        assert!(url.starts_with(AUTH_ENDPOINT));
        assert!(url.contains("client_id=my-client"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A9999"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn multipart_framing_lengths_add_up() {
        let boundary = "updropabc";
        let metadata = r#"{"name":"a.bin"}"#;
        let head = multipart_head(boundary, metadata);
        let tail = multipart_tail(boundary);

        assert!(head.starts_with("--updropabc\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
        assert!(head.contains(metadata));
        assert_eq!(tail, "\r\n--updropabc--\r\n");

        // a 10-byte media part gives an exact content length
        let file_size = 10u64;
        let content_length = head.len() as u64 + file_size + tail.len() as u64;
        assert_eq!(
            content_length,
            (head.len() + 10 + tail.len()) as u64
        );
    }

    #[test]
    fn view_link_shape() {
        assert_eq!(
            view_link("xyz"),
            "https://drive.google.com/file/d/xyz/view?usp=sharing"
        );
    }

    #[tokio::test]
    async fn callback_listener_captures_code() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let browser = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
                .await
                .unwrap();
            stream
                .write_all(b"GET /?code=test-code&scope=x HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        });

        let code = wait_for_code(listener).await.unwrap();
        assert_eq!(code, "test-code");

        let response = browser.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("close this tab"));
    }

    #[tokio::test]
    async fn callback_listener_rejects_codeless_request() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let browser = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
                .await
                .unwrap();
            stream
                .write_all(b"GET /?error=access_denied HTTP/1.1\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        });

        let result = wait_for_code(listener).await;
        assert!(matches!(result, Err(UpdropError::Auth(_))));

        let response = browser.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 400"));
    }
}
