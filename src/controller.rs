//! Client-side state machine for the studio.
//!
//! Mirrors what a UI does around the generation flow: validate the prompt,
//! show a submitting state, store successful results in the history, keep a
//! recency-ordered visible prompt list, and recall cached images without
//! touching the network.

use tracing::warn;

use crate::gemini::ImageGenerator;
use crate::history::HistoryStore;
use crate::storage::{StorageBackend, StorageError};

/// Message shown when the history cannot be persisted for size reasons.
const STORAGE_FULL_MESSAGE: &str = "Error: Storage is full. Please clear history.";

/// Selectable prompt suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylePreset {
    Photorealistic,
    Watercolor,
    PixelArt,
    Sketch,
}

impl StylePreset {
    pub const ALL: [StylePreset; 4] = [
        StylePreset::Photorealistic,
        StylePreset::Watercolor,
        StylePreset::PixelArt,
        StylePreset::Sketch,
    ];

    /// Appended verbatim to the user's prompt before submission.
    pub fn suffix(&self) -> &'static str {
        match self {
            StylePreset::Photorealistic => ", in a photorealistic style",
            StylePreset::Watercolor => ", as a watercolor painting",
            StylePreset::PixelArt => ", as retro pixel art",
            StylePreset::Sketch => ", as a pencil sketch",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StylePreset::Photorealistic => "photorealistic",
            StylePreset::Watercolor => "watercolor",
            StylePreset::PixelArt => "pixel-art",
            StylePreset::Sketch => "sketch",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

/// What the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Submitting,
    ShowingResult { prompt: String, image_url: String },
    Error { message: String },
}

/// Drives the submit / recall / clear flow over an [`ImageGenerator`] and a
/// persisted [`HistoryStore`].
///
/// Submission is single-flight by construction: `submit` holds `&mut self`
/// until the generator call resolves.
pub struct StudioController<G: ImageGenerator, B: StorageBackend> {
    generator: G,
    history: HistoryStore<B>,
    visible_prompts: Vec<String>,
    selected_style: Option<StylePreset>,
    storage_notice: Option<String>,
    state: ViewState,
}

impl<G: ImageGenerator, B: StorageBackend> StudioController<G, B> {
    pub fn new(generator: G, history: HistoryStore<B>) -> Self {
        let visible_prompts = history.recent_prompts();
        Self {
            generator,
            history,
            visible_prompts,
            selected_style: None,
            storage_notice: None,
            state: ViewState::Idle,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Prompts newest-first, as shown in the history list.
    pub fn visible_prompts(&self) -> &[String] {
        &self.visible_prompts
    }

    pub fn selected_style(&self) -> Option<StylePreset> {
        self.selected_style
    }

    pub fn set_style(&mut self, style: Option<StylePreset>) {
        self.selected_style = style;
    }

    /// Storage-full notice, shown alongside the current state when set.
    pub fn storage_notice(&self) -> Option<&str> {
        self.storage_notice.as_deref()
    }

    pub fn history(&self) -> &HistoryStore<B> {
        &self.history
    }

    /// Submit a prompt for generation. A blank prompt fails locally without a
    /// generator call; otherwise the selected style suffix is baked into the
    /// submitted (and stored) prompt text.
    pub async fn submit(&mut self, prompt: &str) -> &ViewState {
        let user_prompt = prompt.trim();
        if user_prompt.is_empty() {
            self.state = ViewState::Error {
                message: "Please enter a prompt.".to_string(),
            };
            return &self.state;
        }

        let final_prompt = match self.selected_style {
            Some(style) => format!("{}{}", user_prompt, style.suffix()),
            None => user_prompt.to_string(),
        };

        self.storage_notice = None;
        self.state = ViewState::Submitting;

        match self.generator.generate(&final_prompt).await {
            Ok(image_url) => {
                match self.history.put(&final_prompt, &image_url) {
                    Ok(()) => {}
                    Err(StorageError::QuotaExceeded) => {
                        self.storage_notice = Some(STORAGE_FULL_MESSAGE.to_string());
                    }
                    Err(e) => warn!("Failed to save history: {}", e),
                }
                self.promote_visible(&final_prompt);
                self.state = ViewState::ShowingResult {
                    prompt: final_prompt,
                    image_url,
                };
            }
            Err(e) => {
                self.state = ViewState::Error {
                    message: e.to_string(),
                };
            }
        }

        &self.state
    }

    /// Recall a previously generated prompt from the cache. Returns `false`
    /// (and leaves the state untouched) when the prompt has no cached image.
    pub fn select_history(&mut self, prompt: &str) -> bool {
        let Some(image_url) = self.history.lookup(prompt) else {
            return false;
        };

        self.selected_style = None;
        self.storage_notice = None;
        self.state = ViewState::ShowingResult {
            prompt: prompt.to_string(),
            image_url,
        };
        true
    }

    /// Wipe the persisted history and the visible list.
    pub fn clear_history(&mut self) -> Result<(), StorageError> {
        self.history.clear()?;
        self.visible_prompts.clear();
        self.storage_notice = None;
        self.state = ViewState::Idle;
        Ok(())
    }

    /// Move `prompt` to the front of the visible list, inserting it if new.
    fn promote_visible(&mut self, prompt: &str) {
        self.visible_prompts.retain(|p| p != prompt);
        self.visible_prompts.insert(0, prompt.to_string());
    }
}
