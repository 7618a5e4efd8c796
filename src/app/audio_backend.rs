use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    OutputCallbackInfo, SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfigRange,
};
use ringbuf::Consumer;
use std::{
    fs::File,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering::Relaxed},
        Arc,
    },
    thread,
    time::Duration,
};
use wav;

pub const RINGBUF_SIZE: usize = 4096;

/// Downstream side of the speaker: something that consumes the mono sample
/// queue at its own cadence.
pub trait AudioBackend {
    fn setup_stream(&mut self, queue: Consumer<i16>, rate: u32);
}

pub struct NullBackend {
    thread: Option<thread::JoinHandle<()>>,
    stop_thread: Arc<AtomicBool>,
}

impl NullBackend {
    pub fn new() -> Self {
        NullBackend {
            thread: None,
            stop_thread: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl AudioBackend for NullBackend {
    fn setup_stream(&mut self, mut queue: Consumer<i16>, _rate: u32) {
        let stop = self.stop_thread.clone();
        self.thread = Option::from(thread::spawn(move || {
            while !stop.load(Relaxed) {
                queue.discard(RINGBUF_SIZE);
                thread::sleep(Duration::from_millis(10));
            }
        }));
    }
}

impl Drop for NullBackend {
    fn drop(&mut self) {
        self.stop_thread.store(true, Relaxed);
        match self.thread.take() {
            Some(handle) => handle.join().unwrap(),
            _ => (),
        };
    }
}

/// Collects everything pushed into the queue and writes a mono 16-bit PCM
/// WAV file when dropped. Stands in for the debug tap the original speaker
/// carried, and doubles as the offline render path.
pub struct WavFileBackend {
    thread: Option<thread::JoinHandle<std::io::Result<()>>>,
    stop_thread: Arc<AtomicBool>,
    output: PathBuf,
}

impl WavFileBackend {
    pub fn new(output: PathBuf) -> Self {
        WavFileBackend {
            thread: None,
            stop_thread: Arc::new(AtomicBool::new(false)),
            output,
        }
    }
}

impl AudioBackend for WavFileBackend {
    fn setup_stream(&mut self, mut queue: Consumer<i16>, rate: u32) {
        let stop = self.stop_thread.clone();
        let output_path = self.output.clone();
        self.thread = Option::from(thread::spawn(move || -> std::io::Result<()> {
            let mut data = Vec::new();
            while !stop.load(Relaxed) {
                while let Some(sample) = queue.pop() {
                    data.push(sample);
                }
                thread::sleep(Duration::from_millis(10));
            }
            while let Some(sample) = queue.pop() {
                data.push(sample);
            }
            let header = wav::Header::new(wav::WAV_FORMAT_PCM, 1, rate, 16);
            let mut file = File::create(output_path)?;
            wav::write(header, &wav::BitDepth::Sixteen(data), &mut file)
        }));
    }
}

impl Drop for WavFileBackend {
    fn drop(&mut self) {
        self.stop_thread.store(true, Relaxed);
        match self.thread.take() {
            Some(handle) => handle.join().unwrap().unwrap(),
            _ => (),
        };
    }
}

/// Pulls mono samples out of the queue and linearly interpolates them up to
/// the device rate. Decays toward silence when the queue runs dry.
struct CpalDriver {
    buffer: Consumer<i16>,
    source_rate: u32,
    device_rate: SampleRate,
    current: f32,
    prev: f32,
    interpolate: f32,
}

impl CpalDriver {
    fn new(buffer: Consumer<i16>, source_rate: u32, device_rate: SampleRate) -> Self {
        CpalDriver {
            buffer,
            source_rate,
            device_rate,
            current: 0.,
            prev: 0.,
            interpolate: 0.,
        }
    }

    fn advance_buffer(&mut self) {
        self.prev = self.current;
        self.current = match self.buffer.pop() {
            Some(s) => s as f32 / 32768.,
            None => self.current * 0.999,
        }
    }

    fn next_sample(&mut self) -> f32 {
        let advance = self.source_rate as f32 / self.device_rate.0 as f32;
        self.interpolate += advance;
        while self.interpolate >= 1. {
            self.advance_buffer();
            self.interpolate -= 1.;
        }
        self.current * self.interpolate + self.prev * (1. - self.interpolate)
    }
}

pub struct CpalBackend {
    stream: Option<Stream>,
}

impl CpalBackend {
    pub fn new() -> Self {
        CpalBackend { stream: None }
    }

    fn choose_stream_config(device: &impl DeviceTrait) -> StreamConfig {
        let configs = device
            .supported_output_configs()
            .expect("Could not retrieve stream configs");
        configs
            .filter(|c| c.channels() == 2 && c.sample_format() == SampleFormat::F32)
            .max_by(SupportedStreamConfigRange::cmp_default_heuristics)
            .expect("Could not find supported sound config")
            .with_max_sample_rate()
            .config()
    }
}

impl AudioBackend for CpalBackend {
    fn setup_stream(&mut self, queue: Consumer<i16>, rate: u32) {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .expect("Failed to retrieve sound device");
        let config = Self::choose_stream_config(&device);
        let err_fn = |err| eprintln!("an error occurred on the output audio stream: {}", err);
        let mut driver = CpalDriver::new(queue, rate, config.sample_rate);
        let output_fn = move |data: &mut [f32], _info: &OutputCallbackInfo| {
            for i in 0..data.len() / 2 {
                let s = driver.next_sample();
                data[2 * i] = s;
                data[2 * i + 1] = s;
            }
        };
        let stream = device
            .build_output_stream(&config, output_fn, err_fn)
            .expect("Failed to create stream");
        stream.play().expect("Failed to start sound playback");
        self.stream = Some(stream);
    }
}
