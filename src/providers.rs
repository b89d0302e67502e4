//! AI generation providers — speech, music, and remix backends with retry,
//! quality gating, curated fallbacks, and a small remix cache.
//!
//! The generator never surfaces a provider failure for a generation request:
//! after the retry budget is exhausted it hands back a curated asset URL so
//! the UI always has something playable. Only the quality verifier can still
//! error, and its failure is treated as "assume acceptable".

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Attempts against the live backend before the curated fallback wins.
const MAX_ATTEMPTS: usize = 2;
/// Remix results kept before the oldest is evicted.
const REMIX_CACHE_CAPACITY: usize = 20;

// ── Request vocabulary ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoiceType {
    Narrator,
    Male,
    Female,
    Robotic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Genre {
    Electronic,
    Dubstep,
    Trap,
    DrumAndBass,
    House,
    LoFi,
    Ambient,
    Pop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mood {
    Neutral,
    Energetic,
    Chill,
    Dark,
    Uplifting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioQuality {
    Draft,
    Standard,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    pub text: String,
    pub voice: VoiceType,
    pub emotion: Mood,
    pub quality: AudioQuality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicRequest {
    pub mood: Mood,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechWithMusicRequest {
    pub text: String,
    pub voice: VoiceType,
    pub emotion: Mood,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    pub quality: AudioQuality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_audio_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemixRequest {
    pub description: String,
    pub genre: Genre,
    pub bpm: f64,
    pub quality: AudioQuality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_audio_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRequest {
    pub text: String,
    pub voice: VoiceType,
    pub genre: Genre,
    pub bpm: f64,
    pub quality: AudioQuality,
}

// ── Responses ───────────────────────────────────────────────

/// A playable result, either generated or served from the curated library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAudio {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    /// True when this is a curated asset standing in for a failed provider.
    #[serde(default)]
    pub from_fallback: bool,
}

impl GeneratedAudio {
    fn fallback(url: &str) -> Self {
        GeneratedAudio {
            url: url.to_string(),
            duration_seconds: None,
            from_fallback: true,
        }
    }
}

/// The combined result of speech-over-music generation: two tracks the
/// player layers itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechWithMusic {
    pub speech: GeneratedAudio,
    pub music: GeneratedAudio,
}

/// Verdict from the quality validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub passes: bool,
    /// Score in 0..=100; heuristic and replaceable, informational only.
    pub quality_score: f64,
    #[serde(default)]
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Confidence {
    High,
    Low,
}

/// What the generator hands back: the audio plus the quality label the
/// caller may want to surface ("low confidence" badge in the UI).
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub audio: GeneratedAudio,
    pub confidence: Confidence,
}

// ── Backend trait ───────────────────────────────────────────

/// A generation service. Implementations do the network work; all retry,
/// fallback, and caching policy lives in [`AudioGenerator`].
#[allow(async_fn_in_trait)]
pub trait GenerationBackend {
    async fn speech(&self, request: &SpeechRequest) -> Result<GeneratedAudio, ProviderError>;
    async fn music(&self, request: &MusicRequest) -> Result<GeneratedAudio, ProviderError>;
    async fn speech_with_music(
        &self,
        request: &SpeechWithMusicRequest,
    ) -> Result<SpeechWithMusic, ProviderError>;
    async fn remix(&self, request: &RemixRequest) -> Result<GeneratedAudio, ProviderError>;
    async fn song(&self, request: &SongRequest) -> Result<GeneratedAudio, ProviderError>;
    async fn verify_quality(&self, audio_url: &str) -> Result<QualityReport, ProviderError>;
}

// ── Curated fallback library ────────────────────────────────

const SPEECH_FALLBACKS: &[(VoiceType, &str)] = &[
    (VoiceType::Narrator, "assets/fallback/speech_narrator.mp3"),
    (VoiceType::Male, "assets/fallback/speech_male.mp3"),
    (VoiceType::Female, "assets/fallback/speech_female.mp3"),
    (VoiceType::Robotic, "assets/fallback/speech_robotic.mp3"),
];
const SPEECH_DEFAULT: &str = "assets/fallback/speech_narrator.mp3";

const MUSIC_FALLBACKS: &[(Genre, &str)] = &[
    (Genre::Dubstep, "assets/fallback/music_dubstep.mp3"),
    (Genre::Trap, "assets/fallback/music_trap.mp3"),
    (Genre::DrumAndBass, "assets/fallback/music_dnb.mp3"),
    (Genre::House, "assets/fallback/music_house.mp3"),
    (Genre::LoFi, "assets/fallback/music_lofi.mp3"),
    (Genre::Ambient, "assets/fallback/music_ambient.mp3"),
];
const MUSIC_DEFAULT: &str = "assets/fallback/music_electronic.mp3";

const MOOD_FALLBACKS: &[(Mood, &str)] = &[
    (Mood::Energetic, "assets/fallback/mood_energetic.mp3"),
    (Mood::Chill, "assets/fallback/mood_chill.mp3"),
    (Mood::Dark, "assets/fallback/mood_dark.mp3"),
    (Mood::Uplifting, "assets/fallback/mood_uplifting.mp3"),
];
const MOOD_DEFAULT: &str = "assets/fallback/mood_chill.mp3";

fn speech_fallback(voice: VoiceType) -> &'static str {
    SPEECH_FALLBACKS
        .iter()
        .find(|(v, _)| *v == voice)
        .map_or(SPEECH_DEFAULT, |(_, url)| url)
}

fn genre_fallback(genre: Genre) -> &'static str {
    MUSIC_FALLBACKS
        .iter()
        .find(|(g, _)| *g == genre)
        .map_or(MUSIC_DEFAULT, |(_, url)| url)
}

fn mood_fallback(mood: Mood) -> &'static str {
    MOOD_FALLBACKS
        .iter()
        .find(|(m, _)| *m == mood)
        .map_or(MOOD_DEFAULT, |(_, url)| url)
}

fn music_fallback(genre: Option<Genre>, mood: Mood) -> &'static str {
    match genre {
        Some(g) => genre_fallback(g),
        None => mood_fallback(mood),
    }
}

// ── Remix cache ─────────────────────────────────────────────

/// Bounded FIFO cache of remix results, keyed by the full request. A hit
/// does not refresh recency; insertion order alone decides eviction.
#[derive(Debug, Clone, Default)]
pub struct RemixCache {
    entries: VecDeque<(String, GeneratedAudio)>,
}

impl RemixCache {
    fn key(request: &RemixRequest) -> String {
        format!(
            "{}|{:?}|{}|{:?}|{:?}|{:?}",
            request.description,
            request.genre,
            request.bpm.to_bits(),
            request.quality,
            request.seed,
            request.uploaded_audio_url
        )
    }

    pub fn get(&self, request: &RemixRequest) -> Option<&GeneratedAudio> {
        let key = Self::key(request);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, audio)| audio)
    }

    pub fn insert(&mut self, request: &RemixRequest, audio: GeneratedAudio) {
        let key = Self::key(request);
        if let Some(existing) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = audio;
            return;
        }
        if self.entries.len() >= REMIX_CACHE_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back((key, audio));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Generator ───────────────────────────────────────────────

/// Policy wrapper around a backend: retries, quality gating, fallbacks,
/// and the remix cache.
#[derive(Debug)]
pub struct AudioGenerator<B> {
    backend: B,
    remix_cache: RemixCache,
}

impl<B: GenerationBackend> AudioGenerator<B> {
    pub fn new(backend: B) -> Self {
        AudioGenerator {
            backend,
            remix_cache: RemixCache::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn remix_cache(&self) -> &RemixCache {
        &self.remix_cache
    }

    /// Generate narrated speech. Falls back to a curated clip for the
    /// requested voice after the retry budget is spent.
    pub async fn speech(&self, request: &SpeechRequest) -> GenerationOutcome {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.backend.speech(request).await {
                Ok(audio) => {
                    return GenerationOutcome {
                        audio,
                        confidence: Confidence::High,
                    };
                }
                Err(e) => log::warn!("speech attempt {attempt} failed: {e}"),
            }
        }
        GenerationOutcome {
            audio: GeneratedAudio::fallback(speech_fallback(request.voice)),
            confidence: Confidence::Low,
        }
    }

    /// Generate a music bed. Never errors; the curated library covers a
    /// total provider outage.
    pub async fn music(&self, request: &MusicRequest) -> GenerationOutcome {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.backend.music(request).await {
                Ok(audio) => {
                    return GenerationOutcome {
                        audio,
                        confidence: Confidence::High,
                    };
                }
                Err(e) => log::warn!("music attempt {attempt} failed: {e}"),
            }
        }
        GenerationOutcome {
            audio: GeneratedAudio::fallback(music_fallback(request.genre, request.mood)),
            confidence: Confidence::Low,
        }
    }

    /// Combined speech-over-music generation. A failed provider yields a
    /// curated pair (voice clip plus genre/mood bed).
    pub async fn speech_with_music(
        &self,
        request: &SpeechWithMusicRequest,
    ) -> (SpeechWithMusic, Confidence) {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.backend.speech_with_music(request).await {
                Ok(pair) => return (pair, Confidence::High),
                Err(e) => log::warn!("speech+music attempt {attempt} failed: {e}"),
            }
        }
        (
            SpeechWithMusic {
                speech: GeneratedAudio::fallback(speech_fallback(request.voice)),
                music: GeneratedAudio::fallback(music_fallback(request.genre, request.emotion)),
            },
            Confidence::Low,
        )
    }

    /// Remix from a description, quality-gated and cached. Identical
    /// requests are served from the cache without touching the backend;
    /// a failing verdict earns one retry with an intensified description,
    /// and a still-failing result ships labeled rather than erroring.
    pub async fn remix(&mut self, request: &RemixRequest) -> GenerationOutcome {
        if let Some(hit) = self.remix_cache.get(request) {
            return GenerationOutcome {
                audio: hit.clone(),
                confidence: Confidence::High,
            };
        }

        let Some(first) = self.attempt_remix(request).await else {
            // Fallbacks are not cached; the next request should retry the
            // backend instead of pinning the curated asset.
            return GenerationOutcome {
                audio: GeneratedAudio::fallback(genre_fallback(request.genre)),
                confidence: Confidence::Low,
            };
        };

        let outcome = if self.verify(&first.url).await {
            GenerationOutcome {
                audio: first,
                confidence: Confidence::High,
            }
        } else {
            let intensified = RemixRequest {
                description: intensify_prompt(&request.description),
                ..request.clone()
            };
            match self.attempt_remix(&intensified).await {
                Some(second) => {
                    let confidence = if self.verify(&second.url).await {
                        Confidence::High
                    } else {
                        Confidence::Low
                    };
                    GenerationOutcome {
                        audio: second,
                        confidence,
                    }
                }
                None => GenerationOutcome {
                    audio: first,
                    confidence: Confidence::Low,
                },
            }
        };

        self.remix_cache.insert(request, outcome.audio.clone());
        outcome
    }

    /// Full song generation with the same quality gate as `remix`.
    pub async fn song(&self, request: &SongRequest) -> GenerationOutcome {
        let Some(first) = self.attempt_song(request).await else {
            return GenerationOutcome {
                audio: GeneratedAudio::fallback(genre_fallback(request.genre)),
                confidence: Confidence::Low,
            };
        };

        if self.verify(&first.url).await {
            return GenerationOutcome {
                audio: first,
                confidence: Confidence::High,
            };
        }

        let intensified = SongRequest {
            text: intensify_prompt(&request.text),
            ..request.clone()
        };
        match self.attempt_song(&intensified).await {
            Some(second) => {
                let confidence = if self.verify(&second.url).await {
                    Confidence::High
                } else {
                    Confidence::Low
                };
                GenerationOutcome {
                    audio: second,
                    confidence,
                }
            }
            None => GenerationOutcome {
                audio: first,
                confidence: Confidence::Low,
            },
        }
    }

    async fn attempt_remix(&self, request: &RemixRequest) -> Option<GeneratedAudio> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.backend.remix(request).await {
                Ok(audio) => return Some(audio),
                Err(e) => log::warn!("remix attempt {attempt} failed: {e}"),
            }
        }
        None
    }

    async fn attempt_song(&self, request: &SongRequest) -> Option<GeneratedAudio> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.backend.song(request).await {
                Ok(audio) => return Some(audio),
                Err(e) => log::warn!("song attempt {attempt} failed: {e}"),
            }
        }
        None
    }

    /// Run the quality verifier. A verifier outage counts as acceptable
    /// rather than blocking delivery.
    async fn verify(&self, url: &str) -> bool {
        match self.backend.verify_quality(url).await {
            Ok(report) => {
                if !report.passes {
                    log::info!(
                        "quality check failed (score {}): {:?}",
                        report.quality_score,
                        report.issues
                    );
                }
                report.passes
            }
            Err(e) => {
                log::warn!("quality verification unavailable, accepting result: {e}");
                true
            }
        }
    }
}

fn intensify_prompt(prompt: &str) -> String {
    format!("{prompt}, studio quality, rich detail, professional mix")
}

// ── HTTP backend ────────────────────────────────────────────

/// JSON-over-HTTP backend for a hosted generation service.
#[cfg(feature = "providers")]
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[cfg(feature = "providers")]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpAudioResponse {
    url: String,
    #[serde(default)]
    duration_seconds: Option<f64>,
}

#[cfg(feature = "providers")]
impl HttpBackend {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        HttpBackend {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn post<Req: Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        request: &Req,
    ) -> Result<Resp, ProviderError> {
        let response = self
            .client
            .post(format!("{}/{endpoint}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable {
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::BadResponse {
                detail: format!("{endpoint} returned {}", response.status()),
            });
        }

        response.json().await.map_err(|e| ProviderError::BadResponse {
            detail: e.to_string(),
        })
    }

    async fn post_audio<Req: Serialize>(
        &self,
        endpoint: &str,
        request: &Req,
    ) -> Result<GeneratedAudio, ProviderError> {
        let body: HttpAudioResponse = self.post(endpoint, request).await?;
        Ok(GeneratedAudio {
            url: body.url,
            duration_seconds: body.duration_seconds,
            from_fallback: false,
        })
    }
}

#[cfg(feature = "providers")]
impl GenerationBackend for HttpBackend {
    async fn speech(&self, request: &SpeechRequest) -> Result<GeneratedAudio, ProviderError> {
        self.post_audio("v1/speech", request).await
    }

    async fn music(&self, request: &MusicRequest) -> Result<GeneratedAudio, ProviderError> {
        self.post_audio("v1/music", request).await
    }

    async fn speech_with_music(
        &self,
        request: &SpeechWithMusicRequest,
    ) -> Result<SpeechWithMusic, ProviderError> {
        self.post("v1/speech-with-music", request).await
    }

    async fn remix(&self, request: &RemixRequest) -> Result<GeneratedAudio, ProviderError> {
        self.post_audio("v1/remix", request).await
    }

    async fn song(&self, request: &SongRequest) -> Result<GeneratedAudio, ProviderError> {
        self.post_audio("v1/song", request).await
    }

    async fn verify_quality(&self, audio_url: &str) -> Result<QualityReport, ProviderError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct VerifyRequest<'a> {
            audio_url: &'a str,
        }
        self.post("v1/verify", &VerifyRequest { audio_url }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn remix_request(description: &str) -> RemixRequest {
        RemixRequest {
            description: description.to_string(),
            genre: Genre::Dubstep,
            bpm: 140.0,
            quality: AudioQuality::Standard,
            seed: None,
            uploaded_audio_url: None,
        }
    }

    fn music_request() -> MusicRequest {
        MusicRequest {
            mood: Mood::Chill,
            genre: Some(Genre::LoFi),
        }
    }

    fn generated(url: &str) -> GeneratedAudio {
        GeneratedAudio {
            url: url.to_string(),
            duration_seconds: Some(30.0),
            from_fallback: false,
        }
    }

    fn passing_report() -> QualityReport {
        QualityReport {
            passes: true,
            quality_score: 85.0,
            issues: Vec::new(),
        }
    }

    /// Backend that always fails generation.
    struct DeadBackend;

    impl GenerationBackend for DeadBackend {
        async fn speech(&self, _: &SpeechRequest) -> Result<GeneratedAudio, ProviderError> {
            Err(ProviderError::Unavailable {
                detail: "down".into(),
            })
        }
        async fn music(&self, _: &MusicRequest) -> Result<GeneratedAudio, ProviderError> {
            Err(ProviderError::Unavailable {
                detail: "down".into(),
            })
        }
        async fn speech_with_music(
            &self,
            _: &SpeechWithMusicRequest,
        ) -> Result<SpeechWithMusic, ProviderError> {
            Err(ProviderError::Unavailable {
                detail: "down".into(),
            })
        }
        async fn remix(&self, _: &RemixRequest) -> Result<GeneratedAudio, ProviderError> {
            Err(ProviderError::Unavailable {
                detail: "down".into(),
            })
        }
        async fn song(&self, _: &SongRequest) -> Result<GeneratedAudio, ProviderError> {
            Err(ProviderError::Unavailable {
                detail: "down".into(),
            })
        }
        async fn verify_quality(&self, _: &str) -> Result<QualityReport, ProviderError> {
            Err(ProviderError::Unavailable {
                detail: "down".into(),
            })
        }
    }

    /// Backend that fails a configurable number of times, then succeeds.
    struct FlakyBackend {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    impl FlakyBackend {
        fn new(failures: usize) -> Self {
            FlakyBackend {
                failures_left: AtomicUsize::new(failures),
                calls: AtomicUsize::new(0),
            }
        }

        fn try_serve(&self, url: &str) -> Result<GeneratedAudio, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                Err(ProviderError::Unavailable {
                    detail: "flaky".into(),
                })
            } else {
                Ok(generated(url))
            }
        }
    }

    impl GenerationBackend for FlakyBackend {
        async fn speech(&self, _: &SpeechRequest) -> Result<GeneratedAudio, ProviderError> {
            self.try_serve("https://cdn.example/speech.mp3")
        }
        async fn music(&self, _: &MusicRequest) -> Result<GeneratedAudio, ProviderError> {
            self.try_serve("https://cdn.example/music.mp3")
        }
        async fn speech_with_music(
            &self,
            _: &SpeechWithMusicRequest,
        ) -> Result<SpeechWithMusic, ProviderError> {
            Ok(SpeechWithMusic {
                speech: generated("https://cdn.example/speech.mp3"),
                music: generated("https://cdn.example/music.mp3"),
            })
        }
        async fn remix(&self, r: &RemixRequest) -> Result<GeneratedAudio, ProviderError> {
            self.try_serve(&format!("https://cdn.example/remix/{}", r.description))
        }
        async fn song(&self, _: &SongRequest) -> Result<GeneratedAudio, ProviderError> {
            self.try_serve("https://cdn.example/song.mp3")
        }
        async fn verify_quality(&self, _: &str) -> Result<QualityReport, ProviderError> {
            Ok(passing_report())
        }
    }

    /// Backend whose verifier always fails the result; records prompts.
    struct PickyBackend {
        prompts: Mutex<Vec<String>>,
    }

    impl PickyBackend {
        fn new() -> Self {
            PickyBackend {
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl GenerationBackend for PickyBackend {
        async fn speech(&self, _: &SpeechRequest) -> Result<GeneratedAudio, ProviderError> {
            Ok(generated("https://cdn.example/speech.mp3"))
        }
        async fn music(&self, _: &MusicRequest) -> Result<GeneratedAudio, ProviderError> {
            Ok(generated("https://cdn.example/music.mp3"))
        }
        async fn speech_with_music(
            &self,
            _: &SpeechWithMusicRequest,
        ) -> Result<SpeechWithMusic, ProviderError> {
            Ok(SpeechWithMusic {
                speech: generated("https://cdn.example/speech.mp3"),
                music: generated("https://cdn.example/music.mp3"),
            })
        }
        async fn remix(&self, r: &RemixRequest) -> Result<GeneratedAudio, ProviderError> {
            self.prompts.lock().unwrap().push(r.description.clone());
            Ok(generated("https://cdn.example/remix.mp3"))
        }
        async fn song(&self, _: &SongRequest) -> Result<GeneratedAudio, ProviderError> {
            Ok(generated("https://cdn.example/song.mp3"))
        }
        async fn verify_quality(&self, _: &str) -> Result<QualityReport, ProviderError> {
            Ok(QualityReport {
                passes: false,
                quality_score: 20.0,
                issues: vec!["muddy low end".to_string()],
            })
        }
    }

    #[tokio::test]
    async fn dead_backend_yields_curated_fallback() {
        let mut generator = AudioGenerator::new(DeadBackend);
        let outcome = generator.remix(&remix_request("night drive")).await;
        assert!(outcome.audio.from_fallback);
        assert_eq!(outcome.audio.url, "assets/fallback/music_dubstep.mp3");
        assert_eq!(outcome.confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn unknown_genre_gets_default_fallback() {
        let generator = AudioGenerator::new(DeadBackend);
        let mut request = music_request();
        request.genre = Some(Genre::Pop); // no curated entry for this one
        let outcome = generator.music(&request).await;
        assert_eq!(outcome.audio.url, MUSIC_DEFAULT);
    }

    #[tokio::test]
    async fn genreless_music_falls_back_by_mood() {
        let generator = AudioGenerator::new(DeadBackend);
        let request = MusicRequest {
            mood: Mood::Dark,
            genre: None,
        };
        let outcome = generator.music(&request).await;
        assert_eq!(outcome.audio.url, "assets/fallback/mood_dark.mp3");
    }

    #[tokio::test]
    async fn speech_fallback_follows_voice() {
        let generator = AudioGenerator::new(DeadBackend);
        let outcome = generator
            .speech(&SpeechRequest {
                text: "hello".to_string(),
                voice: VoiceType::Robotic,
                emotion: Mood::Neutral,
                quality: AudioQuality::Standard,
            })
            .await;
        assert_eq!(outcome.audio.url, "assets/fallback/speech_robotic.mp3");
    }

    #[tokio::test]
    async fn speech_with_music_fallback_is_a_pair() {
        let generator = AudioGenerator::new(DeadBackend);
        let (pair, confidence) = generator
            .speech_with_music(&SpeechWithMusicRequest {
                text: "hello".to_string(),
                voice: VoiceType::Female,
                emotion: Mood::Uplifting,
                genre: None,
                quality: AudioQuality::High,
                uploaded_audio_url: None,
            })
            .await;
        assert!(pair.speech.from_fallback && pair.music.from_fallback);
        assert_eq!(pair.speech.url, "assets/fallback/speech_female.mp3");
        assert_eq!(pair.music.url, "assets/fallback/mood_uplifting.mp3");
        assert_eq!(confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn one_failure_is_retried_within_budget() {
        let generator = AudioGenerator::new(FlakyBackend::new(1));
        let outcome = generator.music(&music_request()).await;
        assert!(!outcome.audio.from_fallback, "Second attempt should succeed");
        assert_eq!(outcome.confidence, Confidence::High);
        assert_eq!(generator.backend().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn budget_is_two_attempts() {
        let generator = AudioGenerator::new(FlakyBackend::new(10));
        let outcome = generator.music(&music_request()).await;
        assert!(outcome.audio.from_fallback);
        assert_eq!(
            generator.backend().calls.load(Ordering::SeqCst),
            2,
            "No third attempt before falling back"
        );
    }

    #[tokio::test]
    async fn failed_quality_triggers_one_intensified_retry() {
        let mut generator = AudioGenerator::new(PickyBackend::new());
        let outcome = generator.remix(&remix_request("night drive")).await;

        let prompts = generator.backend().prompts.lock().unwrap().clone();
        assert_eq!(prompts.len(), 2, "Exactly one quality retry");
        assert_eq!(prompts[0], "night drive");
        assert!(
            prompts[1].starts_with("night drive,"),
            "Retry intensifies the original description: {}",
            prompts[1]
        );
        assert_eq!(
            outcome.confidence,
            Confidence::Low,
            "Still-failing result is labeled, not retried again"
        );
        assert!(!outcome.audio.from_fallback);
    }

    #[tokio::test]
    async fn remix_results_are_cached() {
        let mut generator = AudioGenerator::new(FlakyBackend::new(0));
        let request = remix_request("track-a");

        let first = generator.remix(&request).await;
        let calls_after_first = generator.backend().calls.load(Ordering::SeqCst);
        let second = generator.remix(&request).await;

        assert_eq!(first.audio, second.audio);
        assert_eq!(
            generator.backend().calls.load(Ordering::SeqCst),
            calls_after_first,
            "Cache hit must not touch the backend"
        );
    }

    #[tokio::test]
    async fn different_settings_miss_the_cache() {
        let mut generator = AudioGenerator::new(FlakyBackend::new(0));
        generator.remix(&remix_request("track-a")).await;

        let mut other = remix_request("track-a");
        other.bpm = 174.0;
        let calls_before = generator.backend().calls.load(Ordering::SeqCst);
        generator.remix(&other).await;
        assert!(
            generator.backend().calls.load(Ordering::SeqCst) > calls_before,
            "Same description with different settings is a different key"
        );
    }

    #[tokio::test]
    async fn remix_fallback_is_not_cached() {
        let mut generator = AudioGenerator::new(DeadBackend);
        let outcome = generator.remix(&remix_request("track-a")).await;
        assert!(outcome.audio.from_fallback);
        assert!(generator.remix_cache().is_empty());
    }

    #[tokio::test]
    async fn remix_cache_evicts_oldest_at_capacity() {
        let mut generator = AudioGenerator::new(FlakyBackend::new(0));
        for i in 0..REMIX_CACHE_CAPACITY + 5 {
            generator.remix(&remix_request(&format!("track-{i}"))).await;
        }
        assert_eq!(generator.remix_cache().len(), REMIX_CACHE_CAPACITY);

        // The oldest entries are gone; asking again re-hits the backend
        let calls_before = generator.backend().calls.load(Ordering::SeqCst);
        generator.remix(&remix_request("track-0")).await;
        assert!(
            generator.backend().calls.load(Ordering::SeqCst) > calls_before,
            "Evicted entry should miss the cache"
        );
    }

    #[tokio::test]
    async fn verifier_outage_does_not_block_delivery() {
        struct NoVerify;
        impl GenerationBackend for NoVerify {
            async fn speech(&self, _: &SpeechRequest) -> Result<GeneratedAudio, ProviderError> {
                Ok(generated("https://cdn.example/speech.mp3"))
            }
            async fn music(&self, _: &MusicRequest) -> Result<GeneratedAudio, ProviderError> {
                Ok(generated("https://cdn.example/music.mp3"))
            }
            async fn speech_with_music(
                &self,
                _: &SpeechWithMusicRequest,
            ) -> Result<SpeechWithMusic, ProviderError> {
                Ok(SpeechWithMusic {
                    speech: generated("https://cdn.example/speech.mp3"),
                    music: generated("https://cdn.example/music.mp3"),
                })
            }
            async fn remix(&self, _: &RemixRequest) -> Result<GeneratedAudio, ProviderError> {
                Ok(generated("https://cdn.example/remix.mp3"))
            }
            async fn song(&self, _: &SongRequest) -> Result<GeneratedAudio, ProviderError> {
                Ok(generated("https://cdn.example/song.mp3"))
            }
            async fn verify_quality(&self, _: &str) -> Result<QualityReport, ProviderError> {
                Err(ProviderError::Unavailable {
                    detail: "verifier down".into(),
                })
            }
        }

        let mut generator = AudioGenerator::new(NoVerify);
        let outcome = generator.remix(&remix_request("night drive")).await;
        assert!(!outcome.audio.from_fallback);
        assert_eq!(outcome.confidence, Confidence::High);
    }

    #[test]
    fn requests_serialize_in_camel_case() {
        let json = serde_json::to_string(&remix_request("track-a")).unwrap();
        assert!(json.contains("\"description\""));
        assert!(json.contains("\"bpm\""));
        assert!(!json.contains("uploadedAudioUrl"), "None fields are omitted");

        let back: RemixRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.description, "track-a");
    }
}
