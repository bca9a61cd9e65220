use itertools::Itertools;

/// The qudit pairs two-qudit gates may be placed on.
#[derive(Debug, PartialEq, Eq)]
pub struct Connectivity {
    pub connectivity: Vec<(usize, usize)>,
    name: ConnectivityLayout,
}

/// Different coupling layouts of a register of qudits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectivityLayout {
    /// Nearest neighbours on an open chain.
    Line(usize),
    /// Nearest neighbours on a closed chain.
    Ring(usize),
    /// Every pair of qudits.
    All(usize),
}

impl Connectivity {
    /// Creates the coupling list of the given layout.
    ///
    /// # Examples
    /// ```
    /// # use tnsim::builders::connectivity::{Connectivity, ConnectivityLayout};
    /// let cn = Connectivity::new(ConnectivityLayout::Ring(3));
    /// assert_eq!(cn.connectivity, vec![(0, 1), (1, 2), (0, 2)]);
    /// ```
    #[must_use]
    pub fn new(name: ConnectivityLayout) -> Self {
        let connectivity = match name {
            ConnectivityLayout::Line(n) => line_connect(n),
            ConnectivityLayout::Ring(n) => ring_connect(n),
            ConnectivityLayout::All(n) => all_connect(n),
        };
        Self { connectivity, name }
    }

    #[inline]
    pub fn layout(&self) -> ConnectivityLayout {
        self.name
    }
}

fn line_connect(n: usize) -> Vec<(usize, usize)> {
    (0..n).tuple_windows().collect()
}

fn ring_connect(n: usize) -> Vec<(usize, usize)> {
    let mut v = line_connect(n);
    if n > 2 {
        v.push((0, n - 1));
    }
    v
}

fn all_connect(n: usize) -> Vec<(usize, usize)> {
    (0..n).tuple_combinations().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line() {
        let cn = Connectivity::new(ConnectivityLayout::Line(4));
        assert_eq!(cn.connectivity, vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(cn.layout(), ConnectivityLayout::Line(4));
    }

    #[test]
    fn small_ring_has_no_duplicate_pair() {
        let cn = Connectivity::new(ConnectivityLayout::Ring(2));
        assert_eq!(cn.connectivity, vec![(0, 1)]);
    }

    #[test]
    fn all_pairs() {
        let cn = Connectivity::new(ConnectivityLayout::All(4));
        assert_eq!(cn.connectivity.len(), 6);
        assert_eq!(cn.connectivity[0], (0, 1));
        assert_eq!(cn.connectivity[5], (2, 3));
    }

    #[test]
    fn single_qudit_has_no_pairs() {
        for layout in [
            ConnectivityLayout::Line(1),
            ConnectivityLayout::Ring(1),
            ConnectivityLayout::All(1),
        ] {
            assert!(Connectivity::new(layout).connectivity.is_empty());
        }
    }
}
