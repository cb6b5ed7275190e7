//! # Symbolic Canonical Form Module
//!
//! The matcher decides whether two rate-law formulas are the same algebraic
//! object by bringing both to a canonical form and comparing the results
//! structurally. No numeric sampling and no textual comparison is involved.
//!
//! ## Canonicalization Strategy
//!
//! 1. **Sum flattening**: `Sub` becomes addition of a negated term, nested sums
//!    are flattened into one term list
//! 2. **Product flattening**: `Div` becomes multiplication by a reciprocal
//!    power, nested products are flattened into one factor list
//! 3. **Constant folding**: numeric coefficients and constant powers are folded
//! 4. **Like-factor merge**: equal bases have their exponents summed
//! 5. **Like-term merge**: equal monomials have their coefficients summed
//! 6. **Deterministic ordering**: flattened operands are sorted by their
//!    debug rendering, so term order in the input never matters
//!
//! Sums buried inside a denominator or a power (e.g. `Km + S` in a
//! Michaelis-Menten law) are canonicalized recursively and then treated as
//! opaque factors. Products are NOT distributed over sums: `k * (a + b)` and
//! `k*a + k*b` stay distinct. Matching is defined as exact symbolic identity
//! up to variable renaming, not equivalence under arbitrary rewriting.

use crate::symbolic::symbolic_engine::Expr;

/// The equality oracle used by the permutation matcher.
pub fn symbolic_eq(lhs: &Expr, rhs: &Expr) -> bool {
    lhs.canonical() == rhs.canonical()
}

impl Expr {
    /// Canonical form of the expression; two expressions are symbolically
    /// identical iff their canonical forms are structurally equal.
    pub fn canonical(&self) -> Expr {
        let mut terms: Vec<(f64, Expr)> = Vec::new();
        collect_terms(self, 1.0, &mut terms);
        rebuild_sum(merge_by_key(terms))
    }

    /// Method form of [`symbolic_eq`].
    pub fn equivalent_to(&self, other: &Expr) -> bool {
        symbolic_eq(self, other)
    }
}

// flatten an additive spine into (sign * coeff, monomial) terms
fn collect_terms(expr: &Expr, sign: f64, out: &mut Vec<(f64, Expr)>) {
    match expr {
        Expr::Add(lhs, rhs) => {
            collect_terms(lhs, sign, out);
            collect_terms(rhs, sign, out);
        }
        Expr::Sub(lhs, rhs) => {
            collect_terms(lhs, sign, out);
            collect_terms(rhs, -sign, out);
        }
        other => {
            let (coeff, monomial) = canonical_monomial(other);
            out.push((sign * coeff, monomial));
        }
    }
}

// flatten a multiplicative spine into a numeric coefficient and a sorted,
// exponent-merged factor list; the coefficient is returned separately
fn canonical_monomial(expr: &Expr) -> (f64, Expr) {
    let mut coeff = 1.0;
    let mut factors: Vec<(Expr, f64)> = Vec::new();
    collect_factors(expr, 1.0, &mut coeff, &mut factors);

    // merge equal bases, summing exponents
    let mut merged: Vec<(String, Expr, f64)> = Vec::new();
    for (base, exp) in factors {
        let key = format!("{:?}", base);
        match merged.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, _, total)) => *total += exp,
            None => merged.push((key, base, exp)),
        }
    }
    merged.retain(|(_, _, exp)| *exp != 0.0);
    merged.sort_by(|a, b| a.0.cmp(&b.0));

    let mut monomial: Option<Expr> = None;
    for (_, base, exp) in merged {
        let factor = if exp == 1.0 {
            base
        } else {
            base.pow(Expr::Const(exp))
        };
        monomial = Some(match monomial {
            Some(acc) => acc * factor,
            None => factor,
        });
    }
    (coeff, monomial.unwrap_or(Expr::Const(1.0)))
}

fn collect_factors(expr: &Expr, exp: f64, coeff: &mut f64, out: &mut Vec<(Expr, f64)>) {
    match expr {
        Expr::Mul(lhs, rhs) => {
            collect_factors(lhs, exp, coeff, out);
            collect_factors(rhs, exp, coeff, out);
        }
        Expr::Div(lhs, rhs) => {
            collect_factors(lhs, exp, coeff, out);
            collect_factors(rhs, -exp, coeff, out);
        }
        Expr::Pow(base, exponent) => match exponent.canonical() {
            // constant exponents are folded into the factor exponent,
            // so x^2 * x and x * x * x meet in the same place
            Expr::Const(k) => collect_factors(base, exp * k, coeff, out),
            exponent => out.push((Expr::Pow(Box::new(base.canonical()), Box::new(exponent)), exp)),
        },
        Expr::Const(value) => {
            *coeff *= value.powf(exp);
        }
        Expr::Var(_) => out.push((expr.clone(), exp)),
        // additive subexpressions and surviving calls are opaque factors,
        // canonicalized on their own
        Expr::Add(_, _) | Expr::Sub(_, _) => out.push((expr.canonical(), exp)),
        Expr::Call(name, args) => out.push(
            (
                Expr::Call(name.clone(), args.iter().map(|a| a.canonical()).collect()),
                exp,
            ),
        ),
    }
}

fn merge_by_key(terms: Vec<(f64, Expr)>) -> Vec<(f64, Expr)> {
    let mut merged: Vec<(String, f64, Expr)> = Vec::new();
    for (coeff, monomial) in terms {
        let key = format!("{:?}", monomial);
        match merged.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, total, _)) => *total += coeff,
            None => merged.push((key, coeff, monomial)),
        }
    }
    merged.retain(|(_, coeff, _)| *coeff != 0.0);
    merged.sort_by(|a, b| a.0.cmp(&b.0));
    merged
        .into_iter()
        .map(|(_, coeff, monomial)| (coeff, monomial))
        .collect()
}

fn rebuild_sum(terms: Vec<(f64, Expr)>) -> Expr {
    let mut sum: Option<Expr> = None;
    for (coeff, monomial) in terms {
        let term = if monomial == Expr::Const(1.0) {
            Expr::Const(coeff)
        } else if coeff == 1.0 {
            monomial
        } else {
            Expr::Const(coeff) * monomial
        };
        sum = Some(match sum {
            Some(acc) => acc + term,
            None => term,
        });
    }
    sum.unwrap_or(Expr::Const(0.0))
}
