/// eng
/// The expression-matching engine. Splits the free variables of a rate law into
/// chemical roles, inlines user-defined function calls, and searches the
/// catalog of canonical rate-law patterns for a role-respecting variable
/// renaming under which the test formula is symbolically identical to a
/// catalog formula. Catalog order is match priority: the first entry that
/// matches wins.
/// ----------------------------------------------------------------
/// ru
/// Механизм сопоставления выражений. Разбивает свободные переменные
/// кинетического закона по химическим ролям, подставляет пользовательские
/// функции и ищет в каталоге канонических кинетических законов такое
/// переименование переменных (с сохранением ролей), при котором проверяемая
/// формула символьно совпадает с формулой каталога.
pub mod role_partition;
/// Inlining of user-defined function calls into flat formulas; only primitive
/// call-free expressions reach the matcher.
pub mod function_inliner;
/// The append-only ordered store of canonical rate-law patterns, its json
/// persistence and the built-in seed set.
pub mod catalog;
/// The combinatorial core: cardinality precheck plus exhaustive per-role
/// permutation search validated by the symbolic-equality oracle.
pub mod permutation_matcher;
