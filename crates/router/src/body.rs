use bytes::{Bytes, BytesMut};
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The body of the response sink handed to handlers.
///
/// Handlers and middlewares write into it in place; the serving layer then
/// drains it as an [`http_body::Body`] yielding a single data frame.
#[derive(Default)]
pub struct ResponseBody {
    buf: BytesMut,
    consumed: bool,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn once(bytes: impl Into<Bytes>) -> Self {
        let bytes: Bytes = bytes.into();
        Self { buf: BytesMut::from(bytes.as_ref()), consumed: false }
    }

    /// append raw bytes
    pub fn push(&mut self, bytes: impl AsRef<[u8]>) {
        self.buf.extend_from_slice(bytes.as_ref());
    }

    /// append a string
    pub fn push_str(&mut self, s: &str) {
        self.push(s.as_bytes());
    }

    /// replace whatever was written so far
    pub fn set(&mut self, bytes: impl AsRef<[u8]>) {
        self.buf.clear();
        self.push(bytes);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

impl fmt::Write for ResponseBody {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody").field("len", &self.buf.len()).field("consumed", &self.consumed).finish()
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::once(value)
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Self::once(value)
    }
}

impl From<Bytes> for ResponseBody {
    fn from(value: Bytes) -> Self {
        Self::once(value)
    }
}

impl From<()> for ResponseBody {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.consumed || this.buf.is_empty() {
            this.consumed = true;
            return Poll::Ready(None);
        }

        this.consumed = true;
        Poll::Ready(Some(Ok(Frame::data(this.buf.split().freeze()))))
    }

    fn is_end_stream(&self) -> bool {
        self.consumed || self.buf.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        if self.consumed {
            SizeHint::with_exact(0)
        } else {
            SizeHint::with_exact(self.buf.len() as u64)
        }
    }
}
