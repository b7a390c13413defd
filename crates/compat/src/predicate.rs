//! The predicate algebra (§4.11) and its parsing from an [`Expr`] (§4.7).

use crate::ast::Expr;
use crate::error::{CompatError, Result};
use crate::mask::resolve_mod_mask;

/// The five interpretation match predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Predicate {
    /// `interp.mods == mods` exactly.
    Exactly,
    /// `(interp.mods & mods) == interp.mods`.
    AllOf,
    /// `(interp.mods & mods) != 0`.
    AnyOf,
    /// `mods == 0 || (interp.mods & mods) != 0`.
    AnyOfOrNone,
    /// `(interp.mods & mods) == 0`.
    NoneOf,
}

impl Predicate {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "noneof" => Some(Predicate::NoneOf),
            "anyofornone" => Some(Predicate::AnyOfOrNone),
            "anyof" => Some(Predicate::AnyOf),
            "allof" => Some(Predicate::AllOf),
            "exactly" => Some(Predicate::Exactly),
            _ => None,
        }
    }

    /// Evaluates this predicate against an interpretation's `mods` and the
    /// effective modifier mask at the key level being matched (§4.11).
    pub fn matches(self, interp_mods: u8, mods: u8) -> bool {
        match self {
            Predicate::NoneOf => (interp_mods & mods) == 0,
            Predicate::AnyOfOrNone => mods == 0 || (interp_mods & mods) != 0,
            Predicate::AnyOf => (interp_mods & mods) != 0,
            Predicate::AllOf => (interp_mods & mods) == interp_mods,
            Predicate::Exactly => interp_mods == mods,
        }
    }
}

/// Parses a predicate clause per §4.7's four forms, returning the resolved
/// predicate and its `mods` mask.
pub fn parse_predicate(expr: Option<&Expr>) -> Result<(Predicate, u8)> {
    match expr {
        // (a) missing entirely.
        None => Ok((Predicate::AnyOfOrNone, !0u8)),

        // (c) the bare identifier `any`.
        Some(Expr::Ident(name)) if name.eq_ignore_ascii_case("any") => Ok((Predicate::AnyOf, 0xff)),

        // (b) a call-like form `name(args)`.
        Some(Expr::Call { name, args }) => {
            let predicate = Predicate::from_name(name).ok_or_else(|| CompatError::UnknownPredicate(name.clone()))?;
            let mods = resolve_args_mask(args)?;
            Ok((predicate, mods))
        }

        // (d) any other expression.
        Some(other) => {
            let mods = resolve_mod_mask(other)?;
            Ok((Predicate::Exactly, mods))
        }
    }
}

fn resolve_args_mask(args: &[Expr]) -> Result<u8> {
    args.iter().try_fold(0u8, |mask, arg| Ok(mask | resolve_mod_mask(arg)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_predicate_is_any_of_or_none_with_all_mods() {
        let (predicate, mods) = parse_predicate(None).unwrap();
        assert_eq!(predicate, Predicate::AnyOfOrNone);
        assert_eq!(mods, 0xff);
    }

    #[test]
    fn bare_any_identifier() {
        let (predicate, mods) = parse_predicate(Some(&Expr::Ident("any".into()))).unwrap();
        assert_eq!(predicate, Predicate::AnyOf);
        assert_eq!(mods, 0xff);
    }

    #[test]
    fn call_form_is_case_insensitive() {
        let expr = Expr::Call {
            name: "NoneOf".into(),
            args: vec![Expr::Ident("Shift".into())],
        };
        let (predicate, mods) = parse_predicate(Some(&expr)).unwrap();
        assert_eq!(predicate, Predicate::NoneOf);
        assert_eq!(mods, 0x01);
    }

    #[test]
    fn unknown_call_name_is_an_error() {
        let expr = Expr::Call {
            name: "bogus".into(),
            args: vec![],
        };
        assert!(matches!(
            parse_predicate(Some(&expr)),
            Err(CompatError::UnknownPredicate(_))
        ));
    }

    #[test]
    fn fallback_form_resolves_exactly() {
        let expr = Expr::Ident("Control".into());
        let (predicate, mods) = parse_predicate(Some(&expr)).unwrap();
        assert_eq!(predicate, Predicate::Exactly);
        assert_eq!(mods, 0x04);
    }

    #[test]
    fn predicate_matching_table() {
        assert!(Predicate::NoneOf.matches(0x01, 0x00));
        assert!(!Predicate::NoneOf.matches(0x01, 0x01));

        assert!(Predicate::AnyOfOrNone.matches(0x01, 0x00));
        assert!(Predicate::AnyOfOrNone.matches(0x01, 0x01));
        assert!(!Predicate::AnyOfOrNone.matches(0x01, 0x02));

        assert!(Predicate::AnyOf.matches(0x03, 0x01));
        assert!(!Predicate::AnyOf.matches(0x03, 0x04));

        assert!(Predicate::AllOf.matches(0x03, 0x03));
        assert!(Predicate::AllOf.matches(0x03, 0x07));
        assert!(!Predicate::AllOf.matches(0x03, 0x01));

        assert!(Predicate::Exactly.matches(0x01, 0x01));
        assert!(!Predicate::Exactly.matches(0x01, 0x03));
    }
}
