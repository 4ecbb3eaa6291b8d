//! Symptom → department routing.
//!
//! A fixed, priority-ordered table maps symptom keywords to hospital
//! departments. The table doubles as the deterministic symptom lexicon used
//! by the keyword extraction fallback. Output order follows table priority,
//! not the order symptoms were reported in.

/// Fallback department when nothing specific matched.
pub const GENERAL_MEDICINE: &str = "General Medicine";

struct DepartmentRule {
    keywords: &'static [&'static str],
    departments: &'static [&'static str],
}

/// Priority order: acute-organ specialties first, catch-alls last.
static DEPARTMENT_RULES: &[DepartmentRule] = &[
    DepartmentRule {
        keywords: &["chest pain", "chest tightness", "chest pressure", "palpitations"],
        departments: &["Cardiology"],
    },
    DepartmentRule {
        keywords: &["shortness of breath", "wheezing", "cough", "breathing"],
        departments: &["Pulmonology"],
    },
    DepartmentRule {
        keywords: &["headache", "migraine", "dizziness", "numbness", "tingling", "fainting"],
        departments: &["Neurology"],
    },
    DepartmentRule {
        keywords: &[
            "stomach pain",
            "abdominal pain",
            "nausea",
            "vomiting",
            "diarrhea",
            "constipation",
            "heartburn",
        ],
        departments: &["Gastroenterology"],
    },
    DepartmentRule {
        keywords: &["fever", "chills", "fatigue", "flu"],
        departments: &["General Medicine"],
    },
    DepartmentRule {
        keywords: &["sore throat", "ear pain", "earache", "sinus", "runny nose"],
        departments: &["Otolaryngology"],
    },
    DepartmentRule {
        keywords: &["rash", "itching", "hives", "skin"],
        departments: &["Dermatology"],
    },
    DepartmentRule {
        keywords: &["back pain", "joint pain", "knee pain", "muscle pain", "sprain", "neck pain"],
        departments: &["Orthopedics"],
    },
    DepartmentRule {
        keywords: &["painful urination", "urination", "blood in urine"],
        departments: &["Urology"],
    },
    DepartmentRule {
        keywords: &["eye pain", "blurred vision", "red eye"],
        departments: &["Ophthalmology"],
    },
    DepartmentRule {
        keywords: &["anxiety", "insomnia", "low mood", "panic"],
        departments: &["Psychiatry"],
    },
];

/// Scan free text for known symptom keywords. Returns canonical keyword
/// strings, table order, no duplicates.
pub(crate) fn scan_symptoms(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut found = Vec::new();
    for rule in DEPARTMENT_RULES {
        for keyword in rule.keywords {
            if lower.contains(keyword) && !found.iter().any(|f: &String| f == keyword) {
                found.push((*keyword).to_string());
            }
        }
    }
    found
}

/// Map collected symptoms to departments.
///
/// Many-to-many: a symptom may route to several departments and several
/// symptoms may share one. The result is deduplicated and ordered by table
/// priority. Never empty — an unroutable symptom set falls back to
/// [`GENERAL_MEDICINE`].
pub fn map_departments(symptoms: &[String]) -> Vec<String> {
    let mut departments: Vec<String> = Vec::new();

    for rule in DEPARTMENT_RULES {
        let hit = symptoms.iter().any(|symptom| {
            let symptom = symptom.to_lowercase();
            rule.keywords
                .iter()
                .any(|keyword| symptom.contains(keyword) || keyword.contains(symptom.as_str()))
        });
        if hit {
            for dept in rule.departments {
                if !departments.iter().any(|d| d == dept) {
                    departments.push((*dept).to_string());
                }
            }
        }
    }

    if departments.is_empty() {
        departments.push(GENERAL_MEDICINE.to_string());
    }
    departments
}
