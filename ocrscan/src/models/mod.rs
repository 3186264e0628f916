mod ocr_result;
mod recognition;

pub use ocr_result::*;
pub use recognition::*;
