/*!
Phishing list monitor

Polls the `eth-phishing-detect` list, diffs it against the last snapshot and
relays new entries to the configured outputs.
*/

pub mod core;
