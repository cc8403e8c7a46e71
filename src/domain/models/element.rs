//! Element property helpers.
//!
//! Atomic-number/symbol lookups used for error messages, CSV headers and
//! pure-element standards. Atomic numbers are 1-based; anything outside the
//! known range maps to `"?"`.

/// Element symbols indexed by atomic number minus one.
const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn",
    "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Returns the symbol for an atomic number, or `"?"` if unknown.
pub fn symbol(z: u32) -> &'static str {
    match z.checked_sub(1).map(|i| i as usize) {
        Some(i) if i < SYMBOLS.len() => SYMBOLS[i],
        _ => "?",
    }
}

/// Returns the atomic number for a symbol, if it is a known element.
pub fn atomic_number(sym: &str) -> Option<u32> {
    SYMBOLS
        .iter()
        .position(|&s| s.eq_ignore_ascii_case(sym))
        .map(|i| u32::try_from(i).unwrap_or(u32::MAX) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_known_elements() {
        assert_eq!(symbol(29), "Cu");
        assert_eq!(symbol(79), "Au");
        assert_eq!(symbol(1), "H");
        assert_eq!(symbol(118), "Og");
    }

    #[test]
    fn symbol_out_of_range() {
        assert_eq!(symbol(0), "?");
        assert_eq!(symbol(119), "?");
    }

    #[test]
    fn atomic_number_roundtrip() {
        assert_eq!(atomic_number("Cu"), Some(29));
        assert_eq!(atomic_number("au"), Some(79));
        assert_eq!(atomic_number("Xx"), None);
    }
}
