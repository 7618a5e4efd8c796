use pcspkr::emucore::speaker::{PcSpeaker, SPKR_OUTPUT_RATE};
use pcspkr::emucore::stream::{SpeakerStream, SweepStream, ToneStream};
use std::fs::File;

fn sign_flips(samples: &[i16]) -> usize {
    let mut flips = 0;
    let mut last_positive = None;
    for &s in samples {
        if s == 0 {
            continue;
        }
        let positive = s > 0;
        if let Some(last) = last_positive {
            if last != positive {
                flips += 1;
            }
        }
        last_positive = Some(positive);
    }
    flips
}

#[test]
fn test_one_second_tone() {
    let mut spkr = PcSpeaker::new(SPKR_OUTPUT_RATE);
    spkr.set_frequency(3116, 0.);
    spkr.turn_on();

    let mut out = vec![0i16; SPKR_OUTPUT_RATE as usize];
    spkr.render(&mut out);

    // 3116 Hz maps to PIT divisor 382, i.e. an actual output frequency of
    // 1193182 / 382 ~= 3123.5 Hz, so about 6247 level flips in one second
    let flips = sign_flips(&out);
    assert!((6100..6400).contains(&flips), "flips = {}", flips);
    assert_eq!(*out.iter().max().unwrap(), 5000);
    assert_eq!(*out.iter().min().unwrap(), -5000);
}

#[test]
fn test_immediate_off_is_silent() {
    let mut spkr = PcSpeaker::new(SPKR_OUTPUT_RATE);
    spkr.set_frequency(880, 0.);
    spkr.turn_on();
    spkr.turn_off();

    let mut out = vec![0x11i16; 4096];
    spkr.render(&mut out);
    assert!(out.iter().all(|&s| s == 0));
}

#[test]
fn test_render_in_chunks_matches_single_render() {
    let mut whole = PcSpeaker::new(SPKR_OUTPUT_RATE);
    whole.set_frequency(440, 0.);
    whole.turn_on();
    let mut expected = vec![0i16; 8192];
    whole.render(&mut expected);

    let mut chunked = PcSpeaker::new(SPKR_OUTPUT_RATE);
    chunked.set_frequency(440, 0.);
    chunked.turn_on();
    let mut actual = vec![0i16; 8192];
    for chunk in actual.chunks_mut(577) {
        chunked.render(chunk);
    }

    assert_eq!(expected, actual);
}

#[test]
fn test_streams_to_wav() -> std::io::Result<()> {
    let mut data = Vec::new();
    let mut chunk = [0i16; 512];

    let mut tone = ToneStream::new(SPKR_OUTPUT_RATE, 440, 120);
    while !tone.finished() {
        let n = tone.read(&mut chunk);
        data.extend_from_slice(&chunk[..n]);
    }
    let mut sweep = SweepStream::new(SPKR_OUTPUT_RATE, 300, 1500, 500, 10);
    while !sweep.finished() {
        let n = sweep.read(&mut chunk);
        data.extend_from_slice(&chunk[..n]);
    }
    assert!(data.iter().any(|&s| s != 0));

    let output = std::env::temp_dir().join("pcspkr_streams_test.wav");
    let header = wav::Header::new(wav::WAV_FORMAT_PCM, 1, SPKR_OUTPUT_RATE, 16);
    let mut file = File::create(&output)?;
    wav::write(header, &wav::BitDepth::Sixteen(data), &mut file)?;

    assert!(std::fs::metadata(&output)?.len() > 44);
    std::fs::remove_file(&output)?;
    Ok(())
}
