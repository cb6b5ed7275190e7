/// eng
/// Symbolic backbone of the crate: an expression tree for kinetic formulas with
/// an infix parser, structural substitution and a canonical-form equality oracle.
/// Rate-law matching is defined on these trees, never on formula text, so
/// operator precedence and nested subexpressions are handled correctly.
/// ----------------------------------------------------------------
/// ru
/// Символьная основа пакета: дерево выражений для кинетических формул с
/// парсером инфиксной записи, структурной подстановкой и проверкой
/// эквивалентности через каноническую форму.
pub mod symbolic_engine;
pub mod symbolic_simplify;
