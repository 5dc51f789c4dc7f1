// DataFusion Embedded Engine Module
//
// DataFusion is the embedded analytical engine and its SQL is the canonical
// dialect every query is written in:
// 1. Engine handles owned by callers (session)
// 2. Arrow batch -> record conversion (converter)
// 3. Canonical SQL -> target dialect translation (dialect, translator)

pub mod session;
pub mod dialect;
pub mod converter;
pub mod translator;

pub use session::{DataFusionSessionManager, QueryEngine, SessionConfig};
pub use dialect::DialectTranslator;
pub use converter::DataFusionResultConverter;
pub use translator::{DialectTranslationService, SqlDialect};
