//! Board-level test suites: the perft oracle and property-based checks.

mod perft;
