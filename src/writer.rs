//! Streaming PNG writer.
//!
//! A [`PngWriter`] encodes exactly one image. The protocol is
//! `new` → optional profile and compression setup → [`PngWriter::init`] →
//! row writes → [`PngWriter::close`]. Any failed operation ends the session;
//! the writer can always be dropped.

use std::io::Write;
use std::mem;

use enough::Stop;

use crate::error::{PngWriteError, Stage};
use crate::fault::{self, GuardedSink, SinkFault, report};
use crate::pixel::PixelFormat;
use crate::profile::ColorProfile;
use crate::resolution::Resolution;

/// Largest width or height PNG allows.
pub const MAX_DIMENSION: u32 = i32::MAX as u32;

/// Largest packed scanline accepted by [`PngWriter::init`].
///
/// The engine keeps two row buffers of this size, and an allocation failure
/// aborts instead of returning an error.
pub const MAX_ROW_BYTES: usize = 1 << 30;

/// Deflate effort for image data and the iCCP chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    Fast,
    Balanced,
    /// Maximum compression.
    #[default]
    Best,
}

impl Compression {
    pub(crate) fn to_engine(self) -> png::Compression {
        match self {
            Self::Fast => png::Compression::Fast,
            Self::Balanced => png::Compression::Default,
            Self::Best => png::Compression::Best,
        }
    }

    pub(crate) fn zlib_level(self) -> u8 {
        match self {
            Self::Fast => 1,
            Self::Balanced => 6,
            Self::Best => 9,
        }
    }
}

/// Lifecycle phase of a [`PngWriter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Constructed; configuration is still allowed.
    Unconfigured,
    /// Header written; rows may be streamed.
    HeaderWritten,
    /// Stream complete.
    Finalized,
    /// An operation failed; the session is over.
    Failed,
}

/// Engine state for one open image.
///
/// The `png` writer carries both the output stream and the image metadata,
/// so the two exist or vanish together.
struct Session<W: Write + 'static> {
    stream: png::StreamWriter<'static, GuardedSink<W>>,
    fault: SinkFault,
    height: u32,
    row_bytes: usize,
    rows_written: u32,
}

enum State<W: Write + 'static> {
    Unconfigured,
    HeaderWritten(Session<W>),
    Finalized,
    Failed,
}

impl<W: Write + 'static> State<W> {
    fn phase(&self) -> Phase {
        match self {
            State::Unconfigured => Phase::Unconfigured,
            State::HeaderWritten(_) => Phase::HeaderWritten,
            State::Finalized => Phase::Finalized,
            State::Failed => Phase::Failed,
        }
    }
}

/// Incremental PNG encoder writing to `W`.
///
/// The sink is owned by the engine once [`init`](Self::init) succeeds and is
/// dropped when the stream is finished or the writer is dropped. Use
/// [`crate::MemorySink`] to keep the bytes in memory.
///
/// ```
/// use zenpngwrite::{MemorySink, PixelFormat, PngWriter};
///
/// let sink = MemorySink::new();
/// let mut writer = PngWriter::new(PixelFormat::Gray8);
/// writer.set_srgb_profile()?;
/// writer.init(sink.clone(), 2, 2, 72.0, 72.0)?;
/// writer.write_row(&[0, 255])?;
/// writer.write_row(&[255, 0])?;
/// writer.close()?;
/// assert_eq!(&sink.to_vec()[1..4], b"PNG");
/// # Ok::<(), zenpngwrite::PngWriteError>(())
/// ```
pub struct PngWriter<W: Write + 'static> {
    format: PixelFormat,
    profile: ColorProfile,
    compression: Compression,
    state: State<W>,
}

impl<W: Write + 'static> PngWriter<W> {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            profile: ColorProfile::None,
            compression: Compression::default(),
            state: State::Unconfigured,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn profile(&self) -> &ColorProfile {
        &self.profile
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Rows accepted by the engine so far.
    pub fn rows_written(&self) -> u32 {
        match &self.state {
            State::HeaderWritten(session) => session.rows_written,
            _ => 0,
        }
    }

    /// Embed an ICC profile as an iCCP chunk.
    ///
    /// `name` and `data` are copied; the caller's buffers may be freed
    /// afterwards. Fails if a profile is already configured or the writer has
    /// left the unconfigured phase.
    pub fn set_icc_profile(&mut self, name: &str, data: &[u8]) -> Result<(), PngWriteError> {
        self.configure("set_icc_profile")?;
        let profile = ColorProfile::named(name, data).map_err(report)?;
        self.profile = profile;
        Ok(())
    }

    /// Embed the sRGB marker chunk (relative colorimetric intent).
    pub fn set_srgb_profile(&mut self) -> Result<(), PngWriteError> {
        self.configure("set_srgb_profile")?;
        self.profile = ColorProfile::StandardSrgb;
        Ok(())
    }

    pub fn set_compression(&mut self, compression: Compression) -> Result<(), PngWriteError> {
        self.check_phase(Phase::Unconfigured, "set_compression")?;
        self.compression = compression;
        Ok(())
    }

    fn configure(&self, operation: &'static str) -> Result<(), PngWriteError> {
        self.check_phase(Phase::Unconfigured, operation)?;
        if !self.profile.is_none() {
            return Err(report(PngWriteError::ProfileAlreadySet));
        }
        Ok(())
    }

    fn check_phase(&self, expected: Phase, operation: &'static str) -> Result<(), PngWriteError> {
        let phase = self.phase();
        if phase != expected {
            return Err(report(PngWriteError::InvalidPhase { operation, phase }));
        }
        Ok(())
    }

    /// Validate geometry and resolution, then write the PNG header to `sink`.
    ///
    /// Resolution is validated before the engine is created, so a rejected
    /// DPI leaves `sink` untouched. On any failure the writer moves to
    /// [`Phase::Failed`].
    pub fn init(
        &mut self,
        sink: W,
        width: u32,
        height: u32,
        horizontal_dpi: f64,
        vertical_dpi: f64,
    ) -> Result<(), PngWriteError> {
        self.check_phase(Phase::Unconfigured, "init")?;
        match self.start(sink, width, height, horizontal_dpi, vertical_dpi) {
            Ok(session) => {
                log::debug!(
                    target: "zenpngwrite",
                    "header written: {width}x{height} {:?}",
                    self.format
                );
                self.state = State::HeaderWritten(session);
                Ok(())
            }
            Err(err) => {
                self.state = State::Failed;
                Err(report(err))
            }
        }
    }

    fn start(
        &self,
        sink: W,
        width: u32,
        height: u32,
        horizontal_dpi: f64,
        vertical_dpi: f64,
    ) -> Result<Session<W>, PngWriteError> {
        let resolution = Resolution::from_dpi(horizontal_dpi, vertical_dpi)?;
        if width == 0 || height == 0 {
            return Err(PngWriteError::InvalidDimensions { width, height });
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(PngWriteError::DimensionsTooLarge { width, height });
        }
        let row_bytes = self
            .format
            .row_bytes(width)
            .filter(|&len| len <= MAX_ROW_BYTES)
            .ok_or(PngWriteError::DimensionsTooLarge { width, height })?;

        let format = self.format;
        let compression = self.compression;
        let profile = &self.profile;
        let header_error = PngWriteError::engine(Stage::Header);
        let fault = SinkFault::default();
        let sink = fault.wrap(sink);

        let stream = fault::guard(Stage::Header, || {
            let mut encoder = png::Encoder::new(sink, width, height);
            encoder.set_color(format.channel_layout().color_type());
            encoder.set_depth(format.engine_depth());
            encoder.set_compression(compression.to_engine());
            encoder.set_adaptive_filter(png::AdaptiveFilterType::Adaptive);
            encoder.set_pixel_dims(Some(resolution.pixel_dims()));
            if let Some(intent) = profile.srgb_intent() {
                encoder.set_source_srgb(intent);
            }

            let mut writer = encoder.write_header().map_err(&header_error)?;
            if let Some((chunk, payload)) = profile.iccp_chunk(compression)? {
                writer.write_chunk(chunk, &payload).map_err(&header_error)?;
            }
            writer.into_stream_writer().map_err(&header_error)
        })
        .map_err(|err| fault.resolve(err))?;

        Ok(Session {
            stream,
            fault,
            height,
            row_bytes,
            rows_written: 0,
        })
    }

    /// Write one scanline.
    pub fn write_row(&mut self, row: &[u8]) -> Result<(), PngWriteError> {
        self.write_rows(&[row], enough::Unstoppable)
    }

    /// Write a batch of scanlines, top to bottom.
    ///
    /// Every row is checked against the packed row size and the remaining
    /// row count before any of them reaches the engine. `stop` is polled
    /// every 16 rows.
    pub fn write_rows<R: AsRef<[u8]>>(
        &mut self,
        rows: &[R],
        stop: impl Stop,
    ) -> Result<(), PngWriteError> {
        let result = self.stream_rows(rows.iter().map(|row| row.as_ref()), rows.len(), &stop);
        self.finish_op(result)
    }

    /// Write the remaining rows from one contiguous buffer.
    ///
    /// `pixels` must hold at least `row_bytes * remaining_rows` bytes; any
    /// excess is ignored.
    pub fn write_image(&mut self, pixels: &[u8], stop: impl Stop) -> Result<(), PngWriteError> {
        let (remaining, row_bytes) = match &self.state {
            State::HeaderWritten(session) => (
                (session.height - session.rows_written) as usize,
                session.row_bytes,
            ),
            other => {
                let err = PngWriteError::InvalidPhase {
                    operation: "write_image",
                    phase: other.phase(),
                };
                return self.finish_op(Err(err));
            }
        };

        let needed = row_bytes.saturating_mul(remaining);
        let result = if pixels.len() < needed {
            Err(PngWriteError::BufferTooSmall {
                needed,
                actual: pixels.len(),
            })
        } else {
            self.stream_rows(pixels[..needed].chunks_exact(row_bytes), remaining, &stop)
        };
        self.finish_op(result)
    }

    fn stream_rows<'r>(
        &mut self,
        rows: impl Iterator<Item = &'r [u8]> + Clone,
        count: usize,
        stop: &dyn Stop,
    ) -> Result<(), PngWriteError> {
        let session = match &mut self.state {
            State::HeaderWritten(session) => session,
            other => {
                return Err(PngWriteError::InvalidPhase {
                    operation: "write_rows",
                    phase: other.phase(),
                });
            }
        };

        let remaining = (session.height - session.rows_written) as usize;
        if count > remaining {
            return Err(PngWriteError::TooManyRows {
                height: session.height,
            });
        }
        if let Some(bad) = rows.clone().find(|row| row.len() != session.row_bytes) {
            return Err(PngWriteError::RowLengthMismatch {
                expected: session.row_bytes,
                actual: bad.len(),
            });
        }

        fault::guard(Stage::Rows, || {
            for (i, row) in rows.enumerate() {
                if i % 16 == 0 {
                    stop.check()?;
                }
                session
                    .stream
                    .write_all(row)
                    .map_err(PngWriteError::io(Stage::Rows))?;
                session.rows_written += 1;
            }
            Ok(())
        })
        .map_err(|err| session.fault.resolve(err))
    }

    /// Finish the stream: flush remaining image data and write IEND.
    ///
    /// Every row must have been written.
    pub fn close(&mut self) -> Result<(), PngWriteError> {
        let session = match mem::replace(&mut self.state, State::Failed) {
            State::HeaderWritten(session) => session,
            other => {
                let phase = other.phase();
                self.state = other;
                return Err(report(PngWriteError::InvalidPhase {
                    operation: "close",
                    phase,
                }));
            }
        };

        if session.rows_written != session.height {
            let err = PngWriteError::MissingRows {
                written: session.rows_written,
                expected: session.height,
            };
            fault::release(Stage::Finalize, session);
            return Err(report(err));
        }

        let Session { stream, fault, .. } = session;
        fault::guard(Stage::Finalize, move || {
            stream
                .finish()
                .map_err(PngWriteError::engine(Stage::Finalize))
        })
        .map_err(|err| report(fault.resolve(err)))?;

        self.state = State::Finalized;
        log::debug!(target: "zenpngwrite", "stream finalized");
        Ok(())
    }

    /// Report a failed row operation and end the session.
    fn finish_op(&mut self, result: Result<(), PngWriteError>) -> Result<(), PngWriteError> {
        let Err(err) = result else {
            return Ok(());
        };
        match mem::replace(&mut self.state, State::Failed) {
            State::HeaderWritten(session) => fault::release(Stage::Rows, session),
            State::Finalized => self.state = State::Finalized,
            State::Unconfigured | State::Failed => {}
        }
        Err(report(err))
    }
}

impl<W: Write + 'static> Drop for PngWriter<W> {
    fn drop(&mut self) {
        if let State::HeaderWritten(session) = mem::replace(&mut self.state, State::Failed) {
            log::warn!(
                target: "zenpngwrite",
                "writer dropped after {} of {} rows; output is truncated",
                session.rows_written,
                session.height
            );
            fault::release(Stage::Finalize, session);
        }
    }
}
