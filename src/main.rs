// Renders a short demo reel of period effects to pcspkr_demo.wav.

use pcspkr::emucore::speaker::SPKR_OUTPUT_RATE;
use pcspkr::emucore::stream::{NoiseStream, SpeakerStream, StutterStream, SweepStream, ToneStream};
use pcspkr::util::SpkrResult;
use std::fs::File;
use std::path::Path;

fn render_all(stream: &mut dyn SpeakerStream, data: &mut Vec<i16>) {
    let mut chunk = [0i16; 512];
    while !stream.finished() {
        let n = stream.read(&mut chunk);
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
    }
}

fn main() -> SpkrResult<()> {
    let mut data = Vec::new();
    render_all(&mut ToneStream::new(SPKR_OUTPUT_RATE, 440, 600), &mut data);
    render_all(&mut SweepStream::new(SPKR_OUTPUT_RATE, 200, 2000, 1000, 10), &mut data);
    render_all(&mut NoiseStream::new(SPKR_OUTPUT_RATE, 10, 30, 25_000), &mut data);
    render_all(&mut StutterStream::new(SPKR_OUTPUT_RATE, 3, 1, 0x4e20, 1, 0x320), &mut data);

    let header = wav::Header::new(wav::WAV_FORMAT_PCM, 1, SPKR_OUTPUT_RATE, 16);
    let mut file = File::create(Path::new("pcspkr_demo.wav"))?;
    wav::write(header, &wav::BitDepth::Sixteen(data), &mut file)?;
    Ok(())
}
