/// eng
/// Annotation side of the crate: the model-document collaborator, the
/// per-reaction pipeline that drives the matcher and writes identifiers back
/// onto the model, and the remote SBO catalog source.
/// ----------------------------------------------------------------
/// ru
/// Аннотационная часть пакета: документ модели, конвейер обработки реакций,
/// записывающий идентификаторы обратно в модель, и клиент удалённого
/// каталога SBO.
pub mod model_document;
/// Per-reaction pipeline: strip compartments, inline functions, partition
/// roles, match against the catalog, write identifiers back; unmatched
/// participants fall back to generic role identifiers.
pub mod annotate;
/// Remote catalog source: fetches SBO term definitions over HTTP, converts
/// their MathML lambda into an expression tree and derives the chemical role
/// of every bound variable.
pub mod sbo_client;
