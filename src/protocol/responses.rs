//! Protocol responses
//!
//! Reply codes and the wire format of replies.
//!
//! Plain replies are a single `<code> <text>\r\n` line. Payload replies are a
//! `150 <length> <content-type>[ <file-name>]\r\n` header, exactly `<length>`
//! raw bytes, then `226 Transfer complete\r\n`.

use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reply codes
pub const OPENING_DATA: u16 = 150;
pub const OK: u16 = 200;
pub const READY: u16 = 220;
pub const CLOSING: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const ACTION_OK: u16 = 250;
pub const SERVICE_UNAVAILABLE: u16 = 421;
pub const LOCAL_ERROR: u16 = 451;
pub const SYNTAX_ERROR: u16 = 500;
pub const SYNTAX_ERROR_ARGS: u16 = 501;
pub const CONFLICT: u16 = 521;
pub const FILE_NOT_FOUND: u16 = 550;
pub const INSUFFICIENT_STORAGE: u16 = 552;
pub const NAME_NOT_ALLOWED: u16 = 553;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Body of a payload reply
#[derive(Debug)]
pub enum Payload {
    Bytes(Vec<u8>),
    /// Streamed from disk without buffering
    File(PathBuf),
}

/// A reply to a single command
#[derive(Debug)]
pub enum Reply {
    Message {
        code: u16,
        text: String,
    },
    Payload {
        content_type: String,
        file_name: Option<String>,
        body: Payload,
    },
}

impl Reply {
    pub fn message(code: u16, text: impl Into<String>) -> Self {
        Reply::Message {
            code,
            text: text.into(),
        }
    }

    pub fn bytes(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Reply::Payload {
            content_type: content_type.into(),
            file_name: None,
            body: Payload::Bytes(body),
        }
    }

    pub fn file(content_type: impl Into<String>, path: PathBuf, file_name: Option<String>) -> Self {
        Reply::Payload {
            content_type: content_type.into(),
            file_name,
            body: Payload::File(path),
        }
    }
}

/// Format a single reply line
pub fn format_response(code: u16, message: &str) -> String {
    // a reply is one line; never let a message split it
    let message = message.replace(['\r', '\n'], " ");
    format!("{} {}\r\n", code, message)
}

fn format_payload_header(length: u64, content_type: &str, file_name: Option<&str>) -> String {
    match file_name {
        Some(name) => format!(
            "{} {} {} {}\r\n",
            OPENING_DATA,
            length,
            content_type,
            name.replace(['\r', '\n'], " ")
        ),
        None => format!("{} {} {}\r\n", OPENING_DATA, length, content_type),
    }
}

/// Write a reply to the client
pub async fn write_reply<W: AsyncWrite + Unpin>(writer: &mut W, reply: Reply) -> io::Result<()> {
    match reply {
        Reply::Message { code, text } => {
            writer.write_all(format_response(code, &text).as_bytes()).await?;
        }
        Reply::Payload {
            content_type,
            file_name,
            body: Payload::Bytes(bytes),
        } => {
            let header = format_payload_header(bytes.len() as u64, &content_type, file_name.as_deref());
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&bytes).await?;
            writer
                .write_all(format_response(TRANSFER_COMPLETE, "Transfer complete").as_bytes())
                .await?;
        }
        Reply::Payload {
            content_type,
            file_name,
            body: Payload::File(path),
        } => {
            let file = tokio::fs::File::open(&path).await?;
            let length = file.metadata().await?.len();
            let header = format_payload_header(length, &content_type, file_name.as_deref());
            writer.write_all(header.as_bytes()).await?;

            // the header promised `length` bytes; never send more even if the file grew
            let mut limited = file.take(length);
            let sent = tokio::io::copy(&mut limited, writer).await?;
            if sent != length {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file shrank while sending: {} of {} bytes", sent, length),
                ));
            }
            writer
                .write_all(format_response(TRANSFER_COMPLETE, "Transfer complete").as_bytes())
                .await?;
        }
    }
    writer.flush().await
}
