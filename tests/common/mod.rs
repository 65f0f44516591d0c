#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mj_studio::{
    ArtifactStore, BotCredentials, BotSession, ImagineBot, JobHandle, JobProgress, ProgressSender,
    Result, RetryPolicy, Studio, StudioError, UpscaleTarget,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const QUADRANT_COLORS: [[u8; 3]; 4] = [
    [200, 30, 30],
    [30, 200, 30],
    [30, 30, 200],
    [220, 220, 40],
];

pub fn credentials() -> BotCredentials {
    BotCredentials::new("server-1", "channel-1", "user-token")
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5))
}

/// A PNG contact sheet whose four quadrants are filled with `QUADRANT_COLORS`.
pub fn contact_sheet_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let col = usize::from(x >= width / 2);
        let row = usize::from(y >= height / 2);
        Rgb(QUADRANT_COLORS[row * 2 + col])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Serves `bytes` at `route` and returns the absolute URL.
pub async fn serve_image(server: &MockServer, route: &str, bytes: Vec<u8>) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(bytes),
        )
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

pub fn job(uri: &str) -> JobHandle {
    JobHandle {
        id: "1200000000000000001".to_string(),
        hash: "6a0f1c2e-0000-4e55-9a3b-d1b2c3d4e5f6".to_string(),
        flags: 0,
        content: "**a red fox --ar 16:9** - <@42> (fast)".to_string(),
        uri: uri.to_string(),
    }
}

/// Scripted stand-in for the automation client.
pub struct MockBot {
    job: JobHandle,
    failures_left: AtomicU32,
    return_none: bool,
    pub connects: AtomicU32,
    pub submits: AtomicU32,
    pub closes: AtomicU32,
    pub prompts: Mutex<Vec<String>>,
    pub upscales: Mutex<Vec<UpscaleTarget>>,
}

impl MockBot {
    pub fn new(job: JobHandle) -> Self {
        Self {
            job,
            failures_left: AtomicU32::new(0),
            return_none: false,
            connects: AtomicU32::new(0),
            submits: AtomicU32::new(0),
            closes: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
            upscales: Mutex::new(Vec::new()),
        }
    }

    /// The first `n` submissions fail.
    pub fn failing(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Submissions complete without producing a job.
    pub fn returning_nothing(mut self) -> Self {
        self.return_none = true;
        self
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn complete(&self, progress: &ProgressSender) -> Result<Option<JobHandle>> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        let _ = progress.send(JobProgress {
            job_id: self.job.id.clone(),
            progress: "50%".to_string(),
            uri: None,
        });

        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(StudioError::Job("bot did not answer in time".to_string()));
        }
        if self.return_none {
            return Ok(None);
        }
        Ok(Some(self.job.clone()))
    }
}

#[async_trait]
impl ImagineBot for MockBot {
    async fn connect(&self, credentials: &BotCredentials) -> Result<BotSession> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(BotSession {
            id: "session-1".to_string(),
            server_id: credentials.server_id.clone(),
            channel_id: credentials.channel_id.clone(),
        })
    }

    async fn submit_generate(
        &self,
        _session: &BotSession,
        prompt: &str,
        progress: ProgressSender,
    ) -> Result<Option<JobHandle>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.complete(&progress)
    }

    async fn submit_upscale(
        &self,
        _session: &BotSession,
        target: &UpscaleTarget,
        progress: ProgressSender,
    ) -> Result<Option<JobHandle>> {
        self.upscales.lock().unwrap().push(target.clone());
        self.complete(&progress)
    }

    async fn close(&self, _session: BotSession) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory artifact store that can be told to reject one filename.
#[derive(Default)]
pub struct MemoryStore {
    fail_prefix: Option<String>,
    pub objects: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads whose filename starts with `prefix` fail.
    pub fn failing_on(prefix: &str) -> Self {
        Self {
            fail_prefix: Some(prefix.to_string()),
            ..Default::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, bytes)| bytes.clone())
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn upload(&self, bytes: Vec<u8>, folder: &str, filename: &str) -> Result<String> {
        if let Some(prefix) = &self.fail_prefix {
            if filename.starts_with(prefix.as_str()) {
                return Err(StudioError::Storage(format!("access denied for {}", filename)));
            }
        }
        let key = format!("{}/{}", folder, filename);
        self.objects.lock().unwrap().push((key.clone(), bytes));
        Ok(format!("https://test-bucket.s3.us-east-1.amazonaws.com/{}", key))
    }
}

pub fn studio(bot: &Arc<MockBot>, store: &Arc<MemoryStore>) -> Studio {
    Studio::new(bot.clone(), store.clone())
        .unwrap()
        .with_retry_policy(fast_retry())
}
