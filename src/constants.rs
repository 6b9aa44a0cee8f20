// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Retry budget shared by camera acquisition and endpoint calls
pub mod retry {
    /// Total attempts, including the first one
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Wait before the second attempt; doubles for each further attempt
    pub const INITIAL_BACKOFF_MS: u64 = 1000;
}

/// Inference endpoint defaults
pub mod endpoint {
    /// Base URL of the generative language API
    pub const DEFAULT_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// Multimodal model used for classification
    pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

    /// MIME type requested for the structured output
    pub const RESPONSE_MIME_TYPE: &str = "application/json";
}

/// Fixed instructions sent with every analysis request
pub mod prompts {
    pub const SYSTEM_INSTRUCTION: &str = "You are a vision assistant. Identify the main subject \
        of the photo and describe what you see accurately and without speculation.";

    pub const USER_INSTRUCTION: &str = "Classify the main subject of this image with a short \
        label, then describe it in two or three short sentences, one sentence per line.";

    /// Required string fields of the structured response
    pub const CLASSIFICATION_FIELD: &str = "classification";
    pub const DESCRIPTION_FIELD: &str = "description";
}

/// Still capture defaults
pub mod capture {
    /// Requested frame width
    pub const DEFAULT_WIDTH: u32 = 1280;

    /// Requested frame height
    pub const DEFAULT_HEIGHT: u32 = 720;

    /// JPEG quality used when raw frames are encoded
    pub const DEFAULT_JPEG_QUALITY: u8 = 90;

    /// Default V4L2 capture device
    pub const DEFAULT_DEVICE: &str = "/dev/video0";

    /// Memory-mapped buffers requested from the driver
    pub const STREAM_BUFFERS: u32 = 4;

    /// Dequeue timeout so the capture thread can observe a stop request
    pub const DEQUEUE_TIMEOUT_MS: u64 = 200;

    /// Pause after a failed dequeue
    pub const DEQUEUE_ERROR_PAUSE_MS: u64 = 10;

    /// Consecutive dequeue failures before the capture thread gives up
    pub const MAX_DEQUEUE_ERRORS: u32 = 50;

    /// How long the CLI waits for the first live frame
    pub const FIRST_FRAME_TIMEOUT_SECS: u64 = 5;

    /// Poll interval while waiting for the first frame
    pub const FIRST_FRAME_POLL_MS: u64 = 16;
}

/// Supported image file formats
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }

    /// MIME type for a supported image extension
    pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
        match ext.to_lowercase().as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "gif" => Some("image/gif"),
            "bmp" => Some("image/bmp"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }

    /// Declared type used when nothing better is known
    pub const FALLBACK_MIME: &str = "application/octet-stream";
}
