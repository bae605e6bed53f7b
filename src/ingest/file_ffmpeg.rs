//! Local video file decoding using FFmpeg.
//!
//! Frames are decoded in stream order and converted to RGB24 in memory. The
//! demuxer and decoder are owned by `FfmpegVideoSource` and freed on drop.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use super::video::VideoProperties;
use crate::frame::Frame;
use crate::sampling::normalize_fps;

pub(crate) struct FfmpegVideoSource {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: Option<Scaler>,
    properties: VideoProperties,
    eof_sent: bool,
}

struct Scaler {
    context: ffmpeg::software::scaling::Context,
    format: ffmpeg::util::format::pixel::Pixel,
    width: u32,
    height: u32,
}

impl FfmpegVideoSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open '{}' with ffmpeg", path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let fps = normalize_fps(f64::from(input_stream.avg_frame_rate()))
            .or_else(|| normalize_fps(f64::from(input_stream.rate())));
        let frame_count = u64::try_from(input_stream.frames())
            .ok()
            .filter(|count| *count > 0);

        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let properties = VideoProperties {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            frame_count,
        };
        log::debug!(
            "ffmpeg opened {}: {}x{}, fps={:?}, frames={:?}",
            path,
            properties.width,
            properties.height,
            properties.fps,
            properties.frame_count
        );

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler: None,
            properties,
            eof_sent: false,
        })
    }

    pub(crate) fn properties(&self) -> VideoProperties {
        self.properties
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
            if self.eof_sent {
                return Ok(None);
            }

            let next = self
                .input
                .packets()
                .next()
                .map(|(stream, packet)| (stream.index(), packet));
            match next {
                Some((index, packet)) => {
                    if index != self.stream_index {
                        continue;
                    }
                    self.decoder
                        .send_packet(&packet)
                        .context("send packet to ffmpeg decoder")?;
                }
                None => {
                    self.decoder
                        .send_eof()
                        .context("flush ffmpeg decoder")?;
                    self.eof_sent = true;
                }
            }
        }
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
        let scaler = self.scaler_for(decoded)?;
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        Frame::new(pixels, width, height)
    }

    /// Scaler matching the decoded frame; rebuilt if the stream changes size.
    fn scaler_for(
        &mut self,
        decoded: &ffmpeg::frame::Video,
    ) -> Result<&mut ffmpeg::software::scaling::Context> {
        let stale = self.scaler.as_ref().map_or(true, |scaler| {
            scaler.format != decoded.format()
                || scaler.width != decoded.width()
                || scaler.height != decoded.height()
        });
        if stale {
            let context = ffmpeg::software::scaling::context::Context::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                ffmpeg::util::format::pixel::Pixel::RGB24,
                decoded.width(),
                decoded.height(),
                ffmpeg::software::scaling::flag::Flags::BILINEAR,
            )
            .context("create ffmpeg scaler")?;
            self.scaler = Some(Scaler {
                context,
                format: decoded.format(),
                width: decoded.width(),
                height: decoded.height(),
            });
        }
        self.scaler
            .as_mut()
            .map(|scaler| &mut scaler.context)
            .ok_or_else(|| anyhow!("ffmpeg scaler unavailable"))
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let len = row_bytes * height as usize;
        let pixels = data
            .get(..len)
            .context("ffmpeg frame is shorter than its dimensions")?;
        return Ok((pixels.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::VideoSource;
    use crate::probe::probe_dimensions;
    use ffmpeg::util::format::pixel::Pixel;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    // Uncompressed 4:2:0 clip in YUV4MPEG2 framing, readable by the
    // y4m demuxer and rawvideo decoder.
    fn write_y4m(dir: &Path, width: u32, height: u32, fps: u32, frames: usize) -> PathBuf {
        let path = dir.join("clip.y4m");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "YUV4MPEG2 W{} H{} F{}:1 Ip A1:1 C420jpeg",
            width, height, fps
        )
        .unwrap();
        let luma = (width * height) as usize;
        let chroma = ((width / 2) * (height / 2)) as usize;
        for index in 0..frames {
            file.write_all(b"FRAME\n").unwrap();
            file.write_all(&vec![(40 + index * 60) as u8; luma]).unwrap();
            file.write_all(&vec![128u8; chroma * 2]).unwrap();
        }
        path
    }

    #[test]
    fn padded_rows_are_packed() {
        let mut frame = ffmpeg::frame::Video::new(Pixel::RGB24, 5, 2);
        let stride = frame.stride(0);
        assert!(stride > 15);
        let data = frame.data_mut(0);
        for row in 0..2 {
            for byte in 0..stride {
                data[row * stride + byte] = if byte < 15 { row as u8 + 1 } else { 0xEE };
            }
        }

        let (pixels, width, height) = frame_to_pixels(&frame).unwrap();
        assert_eq!((width, height), (5, 2));
        assert_eq!(pixels.len(), 30);
        assert!(pixels[..15].iter().all(|b| *b == 1));
        assert!(pixels[15..].iter().all(|b| *b == 2));
    }

    #[test]
    fn decodes_every_frame_and_flushes_at_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_y4m(dir.path(), 10, 6, 25, 3);
        let mut source = FfmpegVideoSource::open(path.to_str().unwrap()).unwrap();

        let props = source.properties();
        assert_eq!((props.width, props.height), (10, 6));
        assert_eq!(props.fps, Some(25.0));

        let mut lumas = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!((frame.width, frame.height), (10, 6));
            assert_eq!(frame.pixels().len(), 10 * 6 * 3);
            lumas.push(frame.pixels()[0]);
        }
        assert_eq!(lumas.len(), 3);
        assert!(lumas.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn scaler_follows_frame_size_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_y4m(dir.path(), 10, 6, 25, 1);
        let mut source = FfmpegVideoSource::open(path.to_str().unwrap()).unwrap();

        let small = source.convert(&ffmpeg::frame::Video::new(Pixel::YUV420P, 10, 6));
        assert_eq!(small.map(|f| (f.width, f.height)).unwrap(), (10, 6));

        let large = source.convert(&ffmpeg::frame::Video::new(Pixel::YUV420P, 20, 12));
        assert_eq!(large.map(|f| (f.width, f.height)).unwrap(), (20, 12));
        let scaler = source.scaler.as_ref().unwrap();
        assert_eq!((scaler.width, scaler.height), (20, 12));
    }

    #[test]
    fn dimensions_match_container_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_y4m(dir.path(), 10, 6, 25, 1);
        let path = path.to_str().unwrap();

        assert_eq!(probe_dimensions(path).unwrap().to_string(), "10,6");

        let mut video = VideoSource::open(path).unwrap();
        assert_eq!(video.properties().fps, Some(25.0));
        assert!(video.next_frame().unwrap().is_some());
        assert!(video.next_frame().unwrap().is_none());
    }
}
