//! Agro Advisor Common Library
//!
//! Pure logic shared by the client: domain types, response decoding,
//! soil form coercion, saved-record handling, prompts and translations.

pub mod error;
pub mod i18n;
pub mod parser;
pub mod prompts;
pub mod records;
pub mod soil;
pub mod types;
pub mod validate;

pub use error::{Error, Result};
pub use i18n::{Lang, Translator};
pub use parser::{
    decode_collection, decode_fertilizer, decode_image_path, decode_prediction, extract_json,
    parse_explanation, parse_treatment, server_message, success_flag, Explanation, Treatment,
};
pub use prompts::{
    build_analysis_prompt, build_leaf_prompt, build_record_prompt, render_explanation,
    ExplainRequest,
};
pub use records::{
    merge_records, search_records, ImageRecord, ImageSaveRequest, RecordKind, SavedRecord,
    SoilImageRecord, SoilImageSaveRequest, SoilRecord, SoilSave, SoilSaveRequest,
};
pub use soil::{FertilizerRequest, ResultParams, SoilFormInput, SoilFormSnapshot};
pub use types::{Address, CarriedLeafContext, Crop, PredictionResult, Role, SoilColor, User};
pub use validate::{FieldErrors, RegistrationForm, SignInRequest, SignUpRequest};
