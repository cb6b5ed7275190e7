/// eng
/// Command line front end: flag-pair driven session over the catalog and the
/// annotation pipeline (load/query/save a catalog, map a model, write the
/// annotated result).
/// ----------------------------------------------------------------
/// ru
/// Консольный интерфейс: сеанс работы с каталогом и конвейером аннотирования
/// через пары флагов (загрузка/запрос/сохранение каталога, разметка модели,
/// запись результата).
pub mod cli_main;
