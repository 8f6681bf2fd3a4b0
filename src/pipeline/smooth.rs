//! Phrase-level rewording applied to every selected sentence.
//!
//! Replacement is plain, case-sensitive substring replacement in table order. It does
//! not respect word boundaries (`server` also matches inside `observers`), and one
//! entry's output may contain an earlier entry's pattern (`mainframe` becomes
//! `central server`), so a second pass is not always a no-op. Downstream output
//! depends on both behaviors; they are kept as-is.

pub const PHRASE_TABLE: &[(&str, &str)] = &[
    ("reportedly", "allegedly"),
    ("infiltrated", "breached"),
    ("obtained", "secured"),
    ("suspended", "halted"),
    ("authorities", "officials"),
    ("individuals", "people"),
    ("conducted", "carried out"),
    ("mentioned", "stated"),
    ("approximately", "about"),
    ("considering", "contemplating"),
    ("smashed", "hit"),
    ("crushing", "defeating"),
    ("sealed", "secured"),
    ("deliveries", "balls"),
    ("server", "system"),
    ("technical advice", "technical assistance"),
    ("commenced", "began"),
    ("utilised", "used"),
    ("purchased", "bought"),
    ("demonstrated", "showed"),
    ("significant", "notable"),
    ("mainframe", "central server"),
    ("Prime Minister", "PM"),
    ("Chief Minister", "CM"),
    ("Board of Control for Cricket in India", "BCCI"),
    ("Indian Premier League", "IPL"),
    ("Reserve Bank of India", "RBI"),
    ("Central Bureau of Investigation", "CBI"),
];

pub fn smooth_with(table: &[(&str, &str)], sentence: &str) -> String {
    let mut out = sentence.to_string();
    for &(pattern, replacement) in table {
        if out.contains(pattern) {
            out = out.replace(pattern, replacement);
        }
    }
    out
}

pub fn smooth(sentence: &str) -> String {
    smooth_with(PHRASE_TABLE, sentence)
}
