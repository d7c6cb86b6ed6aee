//! Cursor encoding and decoding.
//!
//! Cursors are opaque, URL-safe tokens issued by the server and echoed back by
//! the client. [`SimplePageCursorCodec`] renders the bare page number;
//! [`IntegrityCheckedCursorCodec`] wraps any codec with a CRC-32C prefix
//! computed over the request shape, so a cursor replayed against a request
//! with different filters, sort, or page size is rejected instead of silently
//! producing a wrong offset. This is not a security boundary: there is no
//! secret, only a guard against accidental misuse.

use thiserror::Error;

use super::request::{CursorContext, PageRequest, RequestContext, SortSpec};

/// Digits of the base-36 alphabet used for the checksum prefix.
const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Width of `u32::MAX` rendered in base 36 (`"1z141z3"`). Every checksum
/// prefix is left-zero-padded to exactly this many characters.
pub const CHECKSUM_WIDTH: usize = 7;

/// Separator between checksum material fields.
const MATERIAL_SEPARATOR: u8 = 0x1f;

/// Constant trailing material. Makes an accidentally compatible checksum from
/// another deployment or tool unlikely; bump the suffix to deliberately
/// invalidate all outstanding cursors.
const MATERIAL_SUFFIX: &str = "pagecraft.cursor.v1";

/// Failure to decode a cursor. Always a client error, never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorDecodeError {
    #[error("cursor `{cursor}` is not a valid page number")]
    MalformedPageNumber { cursor: String },
    #[error("page {page} of size {page_size} overflows the addressable offset range")]
    OffsetOverflow { page: u64, page_size: u64 },
    #[error("cursor is shorter than its integrity checksum")]
    TruncatedCursor,
    #[error("cursor integrity checksum mismatch; the request shape has changed since it was issued")]
    ChecksumMismatch,
}

impl CursorDecodeError {
    /// Whether this failure came from the integrity check rather than the
    /// cursor's own format. Both are surfaced the same way to clients; this
    /// only exists for more specific diagnostics.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            CursorDecodeError::TruncatedCursor | CursorDecodeError::ChecksumMismatch
        )
    }
}

/// Translates between opaque cursors and resolved page requests.
///
/// `decode_cursor(encode_cursor(p)) == p` must hold for any valid request
/// when both run against the same request context.
pub trait CursorCodec {
    fn decode_cursor(&self, context: &CursorContext) -> Result<PageRequest, CursorDecodeError>;

    fn encode_cursor(&self, request: &PageRequest) -> CursorContext;
}

/// Cursor is the decimal page number; absent or empty means page zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplePageCursorCodec;

impl CursorCodec for SimplePageCursorCodec {
    fn decode_cursor(&self, context: &CursorContext) -> Result<PageRequest, CursorDecodeError> {
        let page = match context.cursor_str() {
            None => 0,
            Some(raw) => {
                if !raw.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(CursorDecodeError::MalformedPageNumber {
                        cursor: raw.to_string(),
                    });
                }
                raw.parse::<u64>()
                    .map_err(|_| CursorDecodeError::MalformedPageNumber {
                        cursor: raw.to_string(),
                    })?
            }
        };

        let offset = page.checked_mul(context.page_size).ok_or(
            CursorDecodeError::OffsetOverflow {
                page,
                page_size: context.page_size,
            },
        )?;

        Ok(PageRequest {
            offset,
            page_size: context.page_size,
            sort: context.sort.clone(),
        })
    }

    fn encode_cursor(&self, request: &PageRequest) -> CursorContext {
        CursorContext {
            cursor: Some(request.page_number().to_string()),
            page_size: request.page_size,
            sort: request.sort.clone(),
        }
    }
}

/// Wraps a delegate codec with a fixed-width CRC-32C prefix over the request
/// shape (path, raw query, delegate cursor, page size, sort spec).
///
/// The checksum is recomputed at decode time from the *current* request, so a
/// cursor only round-trips against the request shape it was issued for. An
/// absent cursor addresses the first page and carries no prefix.
#[derive(Debug, Clone)]
pub struct IntegrityCheckedCursorCodec<C> {
    delegate: C,
    request: RequestContext,
}

impl<C: CursorCodec> IntegrityCheckedCursorCodec<C> {
    pub fn new(delegate: C, request: RequestContext) -> Self {
        Self { delegate, request }
    }

    fn checksum(&self, delegate_cursor: &str, page_size: u64, sort: &SortSpec) -> u32 {
        let mut material = Vec::with_capacity(
            self.request.path.len() + self.request.query.len() + delegate_cursor.len() + 48,
        );
        material.extend_from_slice(self.request.path.as_bytes());
        material.push(MATERIAL_SEPARATOR);
        material.extend_from_slice(self.request.query.as_bytes());
        material.push(MATERIAL_SEPARATOR);
        material.extend_from_slice(delegate_cursor.as_bytes());
        material.push(MATERIAL_SEPARATOR);
        material.extend_from_slice(base36(page_size).as_bytes());
        material.push(MATERIAL_SEPARATOR);
        material.extend_from_slice(sort.to_string().as_bytes());
        material.push(MATERIAL_SEPARATOR);
        material.extend_from_slice(MATERIAL_SUFFIX.as_bytes());
        crc32c::crc32c(&material)
    }
}

impl<C: CursorCodec> CursorCodec for IntegrityCheckedCursorCodec<C> {
    fn decode_cursor(&self, context: &CursorContext) -> Result<PageRequest, CursorDecodeError> {
        let Some(raw) = context.cursor_str() else {
            // First page: nothing was issued, nothing to verify.
            return self.delegate.decode_cursor(context);
        };

        let Some((prefix, rest)) = raw.split_at_checked(CHECKSUM_WIDTH) else {
            return Err(CursorDecodeError::TruncatedCursor);
        };

        let expected = base36_checksum(self.checksum(rest, context.page_size, &context.sort));
        if prefix != expected {
            return Err(CursorDecodeError::ChecksumMismatch);
        }

        self.delegate.decode_cursor(&CursorContext {
            cursor: Some(rest.to_string()),
            page_size: context.page_size,
            sort: context.sort.clone(),
        })
    }

    fn encode_cursor(&self, request: &PageRequest) -> CursorContext {
        let inner = self.delegate.encode_cursor(request);
        let delegate_cursor = inner.cursor.unwrap_or_default();
        let prefix = base36_checksum(self.checksum(
            &delegate_cursor,
            request.page_size,
            &request.sort,
        ));

        CursorContext {
            cursor: Some(format!("{prefix}{delegate_cursor}")),
            page_size: inner.page_size,
            sort: inner.sort,
        }
    }
}

/// Minimal base-36 rendering, lowercase, no padding.
fn base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    // Alphabet bytes are ASCII.
    String::from_utf8(digits).unwrap()
}

/// Checksum rendering: base 36, left-zero-padded to [`CHECKSUM_WIDTH`].
fn base36_checksum(value: u32) -> String {
    let digits = base36(u64::from(value));
    let mut out = String::with_capacity(CHECKSUM_WIDTH);
    for _ in digits.len()..CHECKSUM_WIDTH {
        out.push('0');
    }
    out.push_str(&digits);
    out
}
