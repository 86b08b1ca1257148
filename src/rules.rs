//! Transition rules.
//!
//! A rule looks at one [`Window`] and decides what occupies its centre in the
//! next generation. Rules only see the window, never the grid, so they are
//! free to run on many cells at once.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::ConfigError;
use crate::window::Window;

/// Next value of a window's centre cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Carry an existing entity (normally the centre) into the next generation.
    Keep(EntityId),
    /// A new entity is born here.
    Spawn,
}

pub trait Rule: Send + Sync {
    fn name(&self) -> String;

    /// Odd side length of the neighbourhood this rule inspects.
    fn kernel_size(&self) -> usize;

    /// `None` means the centre is empty next generation.
    fn apply(&self, window: &Window) -> Option<Outcome>;
}

#[inline]
fn stay_alive(window: &Window) -> Option<Outcome> {
    window.center().map(Outcome::Keep)
}

const DIAGONAL: [(i32, i32); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];
const CONTIGUOUS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Live counts in the (diagonal, orthogonal) halves of the 8-neighbourhood.
fn split_neighbors(window: &Window) -> (usize, usize) {
    let count = |offsets: &[(i32, i32)]| {
        offsets
            .iter()
            .filter(|&&(dx, dy)| window.rel(dx, dy).is_some())
            .count()
    };
    (count(&DIAGONAL), count(&CONTIGUOUS))
}

/// B3/S23.
#[derive(Clone, Copy, Debug, Default)]
pub struct Conway;

impl Rule for Conway {
    fn name(&self) -> String {
        "conway".into()
    }

    fn kernel_size(&self) -> usize {
        3
    }

    fn apply(&self, window: &Window) -> Option<Outcome> {
        let alive = 8 - window.count_empty_neighbors();
        match window.center() {
            Some(id) if alive == 2 || alive == 3 => Some(Outcome::Keep(id)),
            None if alive == 3 => Some(Outcome::Spawn),
            _ => None,
        }
    }
}

/// Survives unless boxed in orthogonally or crowded diagonally;
/// born next to two or more orthogonal neighbours.
#[derive(Clone, Copy, Debug, Default)]
pub struct Contiguous;

impl Rule for Contiguous {
    fn name(&self) -> String {
        "contiguous".into()
    }

    fn kernel_size(&self) -> usize {
        3
    }

    fn apply(&self, window: &Window) -> Option<Outcome> {
        let (diagonal, contiguous) = split_neighbors(window);
        if window.center().is_some() {
            if contiguous == 4 || diagonal >= 3 {
                return None;
            }
            return stay_alive(window);
        }
        (contiguous >= 2).then_some(Outcome::Spawn)
    }
}

/// Weighs diagonal against orthogonal neighbours.
#[derive(Clone, Copy, Debug, Default)]
pub struct Balance;

impl Rule for Balance {
    fn name(&self) -> String {
        "balance".into()
    }

    fn kernel_size(&self) -> usize {
        3
    }

    fn apply(&self, window: &Window) -> Option<Outcome> {
        let (diagonal, contiguous) = split_neighbors(window);
        let lean = diagonal as i32 - contiguous as i32;
        if window.center().is_some() {
            if lean > 1 {
                return None;
            }
            return stay_alive(window);
        }
        (lean < 0).then_some(Outcome::Spawn)
    }
}

/// Dies when three orthogonal neighbours are live; born from three diagonals.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiagonalBloom;

impl Rule for DiagonalBloom {
    fn name(&self) -> String {
        "diagonal-bloom".into()
    }

    fn kernel_size(&self) -> usize {
        3
    }

    fn apply(&self, window: &Window) -> Option<Outcome> {
        let (diagonal, contiguous) = split_neighbors(window);
        if window.center().is_some() {
            if contiguous >= 3 {
                return None;
            }
            return stay_alive(window);
        }
        (diagonal >= 3).then_some(Outcome::Spawn)
    }
}

/// Largest `/R` radius a rulestring may ask for (kernel 15, 224 neighbours).
pub const MAX_REACH: usize = 7;

const COUNT_WORDS: usize = 4;

/// Bit set of neighbour counts, wide enough for every count at `MAX_REACH`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Counts([u64; COUNT_WORDS]);

impl Counts {
    fn insert(&mut self, c: usize) {
        self.0[c / 64] |= 1u64 << (c % 64);
    }

    #[inline]
    fn contains(&self, c: usize) -> bool {
        c < COUNT_WORDS * 64 && self.0[c / 64] & (1u64 << (c % 64)) != 0
    }

    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..COUNT_WORDS * 64).filter(move |&c| self.contains(c))
    }
}

/// Outer-totalistic rule from a rulestring: `B3/S23`, optionally with a
/// neighbourhood radius `B3/S23/R2` (kernel 5). Counts are single digits,
/// or comma separated once any of them needs two: `B10,11/S8,9,10/R2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LifeLike {
    birth: Counts,
    survive: Counts,
    reach: usize,
}

impl LifeLike {
    /// `None` if `reach` exceeds [`MAX_REACH`] or a count exceeds the number
    /// of neighbours a window of that reach has.
    pub fn new(birth: &[usize], survive: &[usize], reach: usize) -> Option<Self> {
        if reach > MAX_REACH {
            return None;
        }
        let side = 2 * reach + 1;
        let neighbours = side * side - 1;
        let counts = |list: &[usize]| {
            let mut set = Counts::default();
            for &c in list {
                if c > neighbours {
                    return None;
                }
                set.insert(c);
            }
            Some(set)
        };
        Some(Self {
            birth: counts(birth)?,
            survive: counts(survive)?,
            reach,
        })
    }

    pub fn reach(&self) -> usize {
        self.reach
    }

    fn counts(set: &Counts) -> String {
        let list: Vec<String> = set.iter().map(|c| c.to_string()).collect();
        if set.iter().any(|c| c > 9) {
            list.join(",")
        } else {
            list.concat()
        }
    }
}

impl fmt::Display for LifeLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}/S{}", Self::counts(&self.birth), Self::counts(&self.survive))?;
        if self.reach != 1 {
            write!(f, "/R{}", self.reach)?;
        }
        Ok(())
    }
}

impl FromStr for LifeLike {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::BadRulestring(s.to_string());
        let counts = |part: &str, prefix: char| -> Result<Vec<usize>, ConfigError> {
            let rest = part
                .strip_prefix(prefix)
                .or_else(|| part.strip_prefix(prefix.to_ascii_lowercase()))
                .ok_or_else(bad)?;
            if rest.contains(',') {
                return rest
                    .split(',')
                    .map(|c| c.trim().parse::<usize>().map_err(|_| bad()))
                    .collect();
            }
            rest.chars()
                .map(|c| c.to_digit(10).map(|d| d as usize).ok_or_else(bad))
                .collect()
        };

        let mut parts = s.trim().split('/');
        let birth = counts(parts.next().ok_or_else(bad)?, 'B')?;
        let survive = counts(parts.next().ok_or_else(bad)?, 'S')?;
        let reach = match parts.next() {
            None => 1,
            Some(r) => {
                let r = r
                    .strip_prefix('R')
                    .or_else(|| r.strip_prefix('r'))
                    .ok_or_else(bad)?;
                r.parse::<usize>().map_err(|_| bad())?
            }
        };
        if parts.next().is_some() {
            return Err(bad());
        }
        Self::new(&birth, &survive, reach).ok_or_else(bad)
    }
}

impl Rule for LifeLike {
    fn name(&self) -> String {
        self.to_string()
    }

    fn kernel_size(&self) -> usize {
        2 * self.reach.min(MAX_REACH) + 1
    }

    fn apply(&self, window: &Window) -> Option<Outcome> {
        let alive = window.count_live_neighbors();
        match window.center() {
            Some(id) if self.survive.contains(alive) => Some(Outcome::Keep(id)),
            None if self.birth.contains(alive) => Some(Outcome::Spawn),
            _ => None,
        }
    }
}

/// The rules a host can pick by name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RuleKind {
    #[default]
    Conway,
    Contiguous,
    Balance,
    DiagonalBloom,
    LifeLike(LifeLike),
}

impl RuleKind {
    pub const NAMED: [RuleKind; 4] = [
        RuleKind::Conway,
        RuleKind::Contiguous,
        RuleKind::Balance,
        RuleKind::DiagonalBloom,
    ];

    pub fn build(self) -> Box<dyn Rule> {
        match self {
            RuleKind::Conway => Box::new(Conway),
            RuleKind::Contiguous => Box::new(Contiguous),
            RuleKind::Balance => Box::new(Balance),
            RuleKind::DiagonalBloom => Box::new(DiagonalBloom),
            RuleKind::LifeLike(l) => Box::new(l),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Conway => f.write_str("conway"),
            RuleKind::Contiguous => f.write_str("contiguous"),
            RuleKind::Balance => f.write_str("balance"),
            RuleKind::DiagonalBloom => f.write_str("diagonal-bloom"),
            RuleKind::LifeLike(l) => l.fmt(f),
        }
    }
}

impl FromStr for RuleKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conway" | "life" => Ok(RuleKind::Conway),
            "contiguous" => Ok(RuleKind::Contiguous),
            "balance" => Ok(RuleKind::Balance),
            "diagonal-bloom" | "diagonal_bloom" => Ok(RuleKind::DiagonalBloom),
            other if other.starts_with('b') => s.parse().map(RuleKind::LifeLike),
            _ => Err(ConfigError::UnknownRule(s.to_string())),
        }
    }
}

impl TryFrom<String> for RuleKind {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RuleKind> for String {
    fn from(kind: RuleKind) -> Self {
        kind.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::point::Point;
    use crate::window::make_window;

    /// 3x3 grid from a picture; the window is centred on (1, 1).
    fn window(rows: [&str; 3]) -> Window {
        let mut g = Grid::new(3, 3);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == '#' {
                    g.spawn(Point::new(x as i32, y as i32)).unwrap();
                }
            }
        }
        make_window(&g, Point::new(1, 1), 3).unwrap()
    }

    fn lives(rule: &dyn Rule, rows: [&str; 3]) -> bool {
        rule.apply(&window(rows)).is_some()
    }

    #[test]
    fn conway_survival_and_birth() {
        assert!(lives(&Conway, ["#..", ".#.", "..#"]));
        assert!(lives(&Conway, ["##.", ".#.", "..#"]));
        assert!(!lives(&Conway, ["#..", ".#.", "..."]));
        assert!(!lives(&Conway, ["###", "##.", "..."]));
        assert!(lives(&Conway, ["#.#", "...", ".#."]));
        assert!(!lives(&Conway, ["#.#", "...", "..."]));
    }

    #[test]
    fn conway_keeps_centre_identity() {
        let w = window(["#..", ".#.", "..#"]);
        assert_eq!(Conway.apply(&w), Some(Outcome::Keep(w.center().unwrap())));
        let w = window(["#.#", "...", ".#."]);
        assert_eq!(Conway.apply(&w), Some(Outcome::Spawn));
    }

    #[test]
    fn contiguous_thresholds() {
        // boxed in orthogonally
        assert!(!lives(&Contiguous, [".#.", "###", ".#."]));
        // three diagonals
        assert!(!lives(&Contiguous, ["#.#", ".#.", "#.."]));
        assert!(lives(&Contiguous, ["#..", "##.", "..."]));
        assert!(lives(&Contiguous, [".#.", "#..", "..."]));
        assert!(!lives(&Contiguous, ["#.#", "#..", "..."]));
    }

    #[test]
    fn balance_thresholds() {
        // two more diagonals than orthogonals kills
        assert!(!lives(&Balance, ["#.#", ".#.", "..."]));
        assert!(lives(&Balance, ["#.#", "##.", "..."]));
        // birth needs more orthogonal than diagonal
        assert!(lives(&Balance, [".#.", "...", "..."]));
        assert!(!lives(&Balance, ["##.", "...", "..."]));
    }

    #[test]
    fn diagonal_bloom_thresholds() {
        assert!(!lives(&DiagonalBloom, [".#.", "##.", ".#."]));
        assert!(lives(&DiagonalBloom, [".#.", "##.", "..."]));
        assert!(lives(&DiagonalBloom, ["#.#", "...", "#.."]));
        assert!(!lives(&DiagonalBloom, ["#.#", "...", "..."]));
    }

    #[test]
    fn lifelike_b3s23_matches_conway() {
        let life: LifeLike = "B3/S23".parse().unwrap();
        let pictures = [
            ["#..", ".#.", "..#"],
            ["#..", ".#.", "..."],
            ["#.#", "...", ".#."],
            ["###", "##.", "..."],
            ["#.#", "#..", "..."],
        ];
        for p in pictures {
            assert_eq!(lives(&life, p), lives(&Conway, p), "{p:?}");
        }
        assert_eq!(life.kernel_size(), 3);
        assert_eq!(life.to_string(), "B3/S23");
    }

    #[test]
    fn rulestring_parsing() {
        let r: LifeLike = "b36/s23/r2".parse().unwrap();
        assert_eq!(r.kernel_size(), 5);
        assert_eq!(r.to_string(), "B36/S23/R2");
        assert!("B3".parse::<LifeLike>().is_err());
        assert!("B3/X23".parse::<LifeLike>().is_err());
        assert!("B3/S2a".parse::<LifeLike>().is_err());
        assert!("B3/S23/R2/Q".parse::<LifeLike>().is_err());
    }

    #[test]
    fn radius_is_capped() {
        let widest: LifeLike = format!("B3/S23/R{MAX_REACH}").parse().unwrap();
        assert_eq!(widest.kernel_size(), 2 * MAX_REACH + 1);
        for s in [
            "B3/S23/R18446744073709551615".to_string(),
            format!("B3/S23/R{}", MAX_REACH + 1),
            "B3/S23/R5000".to_string(),
        ] {
            assert_eq!(
                s.parse::<RuleKind>(),
                Err(ConfigError::BadRulestring(s.clone())),
                "{s}"
            );
        }
        assert!(LifeLike::new(&[3], &[2, 3], MAX_REACH + 1).is_none());
    }

    #[test]
    fn multi_digit_counts() {
        let r: LifeLike = "B10,12/S8,9,24/R2".parse().unwrap();
        assert_eq!(r.to_string(), "B10,12/S8,9,24/R2");
        assert_eq!(r.to_string().parse::<LifeLike>().unwrap(), r);
        // 24 is every neighbour at reach 2, 25 cannot happen
        assert!("B25/S/R2".parse::<LifeLike>().is_err());
        assert!("B9/S".parse::<LifeLike>().is_err());
        assert!("B1,x/S".parse::<LifeLike>().is_err());

        // a dot with ten neighbours at reach 2 survives
        let mut g = Grid::new(5, 5);
        let centre = g.spawn(Point::new(2, 2)).unwrap();
        for x in 0..5 {
            g.spawn(Point::new(x, 0)).unwrap();
            g.spawn(Point::new(x, 4)).unwrap();
        }
        let w = make_window(&g, Point::new(2, 2), 5).unwrap();
        assert_eq!(w.count_live_neighbors(), 10);
        let r: LifeLike = "B/S10,11/R2".parse().unwrap();
        assert_eq!(r.apply(&w), Some(Outcome::Keep(centre)));
        let r: LifeLike = "B/S1/R2".parse().unwrap();
        assert_eq!(r.apply(&w), None);
    }

    #[test]
    fn rule_kind_round_trips_through_names() {
        for kind in RuleKind::NAMED {
            assert_eq!(kind.to_string().parse::<RuleKind>().unwrap(), kind);
            assert_eq!(kind.build().name(), kind.to_string());
        }
        assert!(matches!(
            "B2/S".parse::<RuleKind>(),
            Ok(RuleKind::LifeLike(_))
        ));
        assert_eq!(
            "seeds".parse::<RuleKind>(),
            Err(ConfigError::UnknownRule("seeds".into()))
        );
    }

    #[test]
    fn rule_kind_serde_uses_names() {
        let json = serde_json::to_string(&RuleKind::DiagonalBloom).unwrap();
        assert_eq!(json, "\"diagonal-bloom\"");
        let back: RuleKind = serde_json::from_str("\"B36/S23\"").unwrap();
        assert_eq!(back.to_string(), "B36/S23");
    }
}
