/// Static per-subject exam shape. Objective answers are multiple choice
/// (options 1..=5); subjective items are free-response, graded by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectDef {
    pub objective: usize,
    pub subjective: usize,
}

const SUBJECTS: &[(&str, SubjectDef)] = &[
    ("Korean (Year 1)", SubjectDef { objective: 24, subjective: 6 }),
    ("English (Year 1)", SubjectDef { objective: 22, subjective: 5 }),
    ("Math (Year 1)", SubjectDef { objective: 17, subjective: 5 }),
    ("Integrated Social Studies", SubjectDef { objective: 24, subjective: 6 }),
    ("Integrated Science", SubjectDef { objective: 22, subjective: 5 }),
    ("Korean History", SubjectDef { objective: 20, subjective: 8 }),
    ("Algebra", SubjectDef { objective: 17, subjective: 5 }),
    ("Calculus 1", SubjectDef { objective: 17, subjective: 5 }),
    ("Probability and Statistics", SubjectDef { objective: 17, subjective: 5 }),
    ("Math Project Inquiry", SubjectDef { objective: 17, subjective: 5 }),
    ("Korean (Year 2)", SubjectDef { objective: 24, subjective: 6 }),
    ("English (Year 2)", SubjectDef { objective: 22, subjective: 8 }),
    ("Physics", SubjectDef { objective: 20, subjective: 6 }),
    ("Chemistry", SubjectDef { objective: 20, subjective: 6 }),
    ("Biology", SubjectDef { objective: 20, subjective: 6 }),
    ("Earth Science", SubjectDef { objective: 20, subjective: 6 }),
    ("Society and Culture", SubjectDef { objective: 20, subjective: 8 }),
    ("Ethics", SubjectDef { objective: 25, subjective: 5 }),
    ("Geography", SubjectDef { objective: 20, subjective: 6 }),
    ("History", SubjectDef { objective: 20, subjective: 6 }),
    ("Chinese", SubjectDef { objective: 28, subjective: 0 }),
    ("Japanese", SubjectDef { objective: 28, subjective: 0 }),
    ("Reading and Composition", SubjectDef { objective: 24, subjective: 6 }),
    ("English Reading and Composition", SubjectDef { objective: 22, subjective: 8 }),
    ("Advanced Math", SubjectDef { objective: 17, subjective: 5 }),
    ("Language Use Inquiry", SubjectDef { objective: 24, subjective: 6 }),
    ("Economic Math", SubjectDef { objective: 17, subjective: 5 }),
    ("Calculus 2", SubjectDef { objective: 17, subjective: 5 }),
    ("Advanced English", SubjectDef { objective: 22, subjective: 8 }),
    ("Economics", SubjectDef { objective: 20, subjective: 8 }),
    ("Korean Geography Inquiry", SubjectDef { objective: 20, subjective: 6 }),
    ("East Asian History", SubjectDef { objective: 20, subjective: 6 }),
    ("Ethics and Thought", SubjectDef { objective: 25, subjective: 5 }),
    ("Electromagnetism and Quantum", SubjectDef { objective: 20, subjective: 6 }),
    ("Chemical Reactions", SubjectDef { objective: 19, subjective: 6 }),
    ("Genetics", SubjectDef { objective: 20, subjective: 6 }),
    ("Planetary and Space Science", SubjectDef { objective: 20, subjective: 6 }),
];

const YEAR_LEVELS: &[(&str, &[&str])] = &[
    (
        "year1",
        &[
            "Korean (Year 1)",
            "English (Year 1)",
            "Math (Year 1)",
            "Integrated Social Studies",
            "Integrated Science",
            "Korean History",
        ],
    ),
    (
        "year2",
        &[
            "Algebra",
            "Calculus 1",
            "Probability and Statistics",
            "Math Project Inquiry",
            "Korean (Year 2)",
            "English (Year 2)",
            "Physics",
            "Chemistry",
            "Biology",
            "Earth Science",
            "Society and Culture",
            "Ethics",
            "Geography",
            "History",
            "Chinese",
            "Japanese",
        ],
    ),
    (
        "year3",
        &[
            "Reading and Composition",
            "English Reading and Composition",
            "Advanced Math",
            "Language Use Inquiry",
            "Economic Math",
            "Calculus 2",
            "Advanced English",
            "Economics",
            "Korean Geography Inquiry",
            "East Asian History",
            "Ethics and Thought",
            "Electromagnetism and Quantum",
            "Chemical Reactions",
            "Genetics",
            "Planetary and Space Science",
        ],
    ),
];

pub fn subject_def(name: &str) -> Option<SubjectDef> {
    SUBJECTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, def)| *def)
}

pub fn subject_names() -> Vec<&'static str> {
    SUBJECTS.iter().map(|(n, _)| *n).collect()
}

pub fn year_level_subjects(year_level: &str) -> Option<&'static [&'static str]> {
    YEAR_LEVELS
        .iter()
        .find(|(y, _)| *y == year_level)
        .map(|(_, subs)| *subs)
}

pub fn is_year_level(year_level: &str) -> bool {
    YEAR_LEVELS.iter().any(|(y, _)| *y == year_level)
}
