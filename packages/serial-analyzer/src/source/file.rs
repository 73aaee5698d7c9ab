// File-based frame source that simulates a serial device
//
// Replays a recorded capture as consecutive fixed-size frames, useful for:
// - Running the analyzers without hardware attached
// - Replaying recorded sessions
// - Tests

use super::{fill_frame, FrameSource};
use crate::error::{SourceError, SourceResult};
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

pub struct FileFrameSource {
    path: PathBuf,
    reader: BufReader<File>,
    frame_size: usize,
    rate_limit: Option<Duration>,
    loop_playback: bool,
}

impl FileFrameSource {
    pub fn open(
        path: &str,
        frame_size: usize,
        rate_limit: Option<Duration>,
        loop_playback: bool,
    ) -> SourceResult<Self> {
        let file = File::open(path).map_err(|e| SourceError::Open(path.to_string(), e.to_string()))?;

        log::info!("Replaying {} in {}-byte frames", path, frame_size);

        Ok(Self {
            path: PathBuf::from(path),
            reader: BufReader::new(file),
            frame_size,
            rate_limit,
            loop_playback,
        })
    }
}

impl FrameSource for FileFrameSource {
    fn read_frame(&mut self) -> SourceResult<Vec<u8>> {
        if let Some(delay) = self.rate_limit {
            std::thread::sleep(delay);
        }

        let mut frame = vec![0u8; self.frame_size];
        let mut read = fill_frame(&mut self.reader, &mut frame)?;

        // Rewind only on a clean frame boundary so an empty file cannot spin forever
        if read == 0 && self.loop_playback && self.reader.stream_position()? > 0 {
            log::debug!("End of {} reached, looping", self.path.display());
            self.reader.seek(SeekFrom::Start(0))?;
            read = fill_frame(&mut self.reader, &mut frame)?;
        }

        if read != self.frame_size {
            return Err(SourceError::ShortFrame {
                expected: self.frame_size,
                actual: read,
            });
        }
        Ok(frame)
    }

    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
