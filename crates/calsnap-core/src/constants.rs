//! Wire-level constants shared by the pipeline stages.

/// `source` of object-created events emitted by the object store.
pub const OBJECT_STORE_SOURCE: &str = "aws.s3";

/// `detail-type` of object-created events.
pub const OBJECT_CREATED_DETAIL_TYPE: &str = "Object Created";

/// `source` of completion events emitted by the OCR orchestrator.
pub const OCR_SOURCE: &str = "custom.ocr";

/// `detail-type` of completion events.
pub const OCR_COMPLETED_DETAIL_TYPE: &str = "OCRCompleted";

/// Extension appended to a post id to form its storage key.
pub const IMAGE_KEY_EXTENSION: &str = "jpg";

/// Content type recorded for stored feed images.
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Lifetime of the presigned read URL handed to the vision service.
pub const PRESIGNED_URL_TTL_SECS: u64 = 3600;

/// Instruction sent alongside every image: return the visible text verbatim,
/// without extra line breaks or commentary.
pub const OCR_INSTRUCTION: &str =
    "以下の画像に含まれる文字を抽出し、余計な改行や説明を含まず、テキストのみ返してください。";
