/*!
Framer: splits a binary DataFlash stream on the two-byte sync marker
`0xA3 0x95` into variable-length frames (§4.1).
*/
use std::io::Read;

pub const SYNC_MARKER: [u8; 2] = [0xA3, 0x95];
const BLOCK_SIZE: usize = 4096;

/// Splits `input` on [`SYNC_MARKER`], yielding the bytes strictly between
/// markers. The marker itself is never part of a yielded frame. Reads in
/// fixed-size blocks, buffering partial frames across block boundaries; the
/// trailing run of bytes after the last marker is yielded as a final frame.
pub struct Framer<R> {
    input: R,
    buffer: Vec<u8>,
    eof: bool,
}

impl<R: Read> Framer<R> {
    pub fn new(input: R) -> Self {
        Framer {
            input,
            buffer: Vec::new(),
            eof: false,
        }
    }

    fn fill(&mut self) -> std::io::Result<()> {
        let mut block = [0u8; BLOCK_SIZE];
        let n = self.input.read(&mut block)?;
        if n == 0 {
            self.eof = true;
        } else {
            self.buffer.extend_from_slice(&block[..n]);
        }
        Ok(())
    }

    /// Returns the next frame, `Ok(None)` once the stream is exhausted.
    pub fn next_frame(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(pos) = find_marker(&self.buffer) {
                let frame = self.buffer[..pos].to_vec();
                self.buffer.drain(..pos + SYNC_MARKER.len());
                return Ok(Some(frame));
            }
            if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.buffer)));
            }
            self.fill()?;
        }
    }
}

fn find_marker(buffer: &[u8]) -> Option<usize> {
    if buffer.len() < SYNC_MARKER.len() {
        return None;
    }
    buffer
        .windows(SYNC_MARKER.len())
        .position(|w| w == SYNC_MARKER)
}

/// Consumes a [`Framer`] entirely, returning every frame it yields.
pub fn frame_all<R: Read>(input: R) -> std::io::Result<Vec<Vec<u8>>> {
    let mut framer = Framer::new(input);
    let mut frames = Vec::new();
    while let Some(frame) = framer.next_frame()? {
        frames.push(frame);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_marker() {
        let data = [
            &[1u8, 2, 3][..],
            &SYNC_MARKER,
            &[4, 5][..],
            &SYNC_MARKER,
            &[6][..],
        ]
        .concat();
        let frames = frame_all(&data[..]).unwrap();
        assert_eq!(frames, vec![vec![1, 2, 3], vec![4, 5], vec![6]]);
    }

    #[test]
    fn empty_input_yields_no_frames() {
        let frames = frame_all(&[][..]).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn marker_spanning_block_boundary_is_found() {
        // force a marker to straddle the 4096-byte block read boundary
        let mut data = vec![0u8; BLOCK_SIZE - 1];
        data.push(SYNC_MARKER[0]);
        data.push(SYNC_MARKER[1]);
        data.extend_from_slice(&[9, 9]);
        let frames = frame_all(&data[..]).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], vec![9, 9]);
    }
}
