// 🧑 Name & Contact Synthesizer
// US first/last names, email and phone; nothing here comes from the dataset

use crate::error::{ForgeError, Result};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FIRST_NAMES_MALE: &[&str] = &[
    "James", "John", "Robert", "Michael", "William", "David", "Richard", "Joseph", "Thomas",
    "Charles", "Christopher", "Daniel", "Matthew", "Anthony", "Mark", "Donald", "Steven", "Paul",
    "Andrew", "Joshua", "Kenneth", "Kevin", "Brian", "George", "Edward", "Ronald", "Timothy",
    "Jason", "Jeffrey", "Ryan", "Jacob", "Gary", "Nicholas", "Eric", "Jonathan", "Stephen",
    "Larry", "Justin", "Scott", "Brandon", "Benjamin", "Samuel", "Raymond", "Gregory", "Frank",
    "Alexander", "Patrick", "Jack", "Dennis", "Jerry", "Tyler", "Aaron", "Jose", "Adam", "Henry",
    "Nathan", "Douglas", "Zachary", "Peter", "Kyle", "Walter", "Ethan", "Jeremy", "Harold",
    "Keith", "Christian", "Roger", "Noah", "Gerald", "Carl", "Terry", "Sean", "Austin", "Arthur",
    "Lawrence", "Jesse", "Dylan", "Bryan", "Joe", "Jordan", "Billy", "Bruce", "Albert", "Willie",
    "Gabriel", "Logan", "Alan", "Juan", "Wayne", "Roy", "Ralph", "Randy", "Eugene",
];

const FIRST_NAMES_FEMALE: &[&str] = &[
    "Mary", "Patricia", "Jennifer", "Linda", "Barbara", "Elizabeth", "Susan", "Jessica", "Sarah",
    "Karen", "Nancy", "Lisa", "Betty", "Margaret", "Sandra", "Ashley", "Kimberly", "Emily",
    "Donna", "Michelle", "Dorothy", "Carol", "Amanda", "Melissa", "Deborah", "Stephanie",
    "Rebecca", "Sharon", "Laura", "Cynthia", "Kathleen", "Amy", "Angela", "Shirley", "Anna",
    "Brenda", "Pamela", "Emma", "Nicole", "Helen", "Samantha", "Katherine", "Christine", "Debra",
    "Rachel", "Carolyn", "Janet", "Catherine", "Maria", "Heather", "Diane", "Ruth", "Julie",
    "Olivia", "Joyce", "Virginia", "Victoria", "Kelly", "Lauren", "Christina", "Joan", "Evelyn",
    "Judith", "Megan", "Andrea", "Cheryl", "Hannah", "Jacqueline", "Martha", "Gloria", "Teresa",
    "Ann", "Sara", "Madison", "Frances", "Kathryn", "Janice", "Jean", "Abigail", "Alice", "Judy",
    "Sophia", "Grace", "Denise", "Amber", "Doris", "Marilyn", "Danielle", "Beverly", "Isabella",
    "Theresa", "Diana", "Natalie", "Brittany",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez",
    "Clark", "Ramirez", "Lewis", "Robinson", "Walker", "Young", "Allen", "King", "Wright",
    "Scott", "Torres", "Nguyen", "Hill", "Flores", "Green", "Adams", "Nelson", "Baker", "Hall",
    "Rivera", "Campbell", "Mitchell", "Carter", "Roberts", "Gomez", "Phillips", "Evans", "Turner",
    "Diaz", "Parker", "Cruz", "Edwards", "Collins", "Reyes", "Stewart", "Morris", "Morales",
    "Murphy", "Cook", "Rogers", "Gutierrez", "Ortiz", "Morgan", "Cooper", "Peterson", "Bailey",
    "Reed", "Kelly", "Howard", "Ramos", "Kim", "Cox", "Ward", "Richardson", "Watson", "Brooks",
];

const EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "icloud.com",
    "aol.com",
    "mail.com",
    "protonmail.com",
];

/// Countries with a dedicated name set; others fall back to the US set
pub const SUPPORTED_COUNTRIES: &[&str] = &["US"];

// ============================================================================
// GENDER / PERSON NAME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Any,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Any => "any",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "" | "any" | "random" => Ok(Gender::Any),
            other => Err(ForgeError::Config(format!("unknown gender '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
}

// ============================================================================
// NAME SOURCE
// ============================================================================

/// Name/contact synthesizer consumed by the identity composer
pub trait NameSource: Send + Sync {
    fn person(&self, rng: &mut dyn RngCore, gender: Gender) -> PersonName;
    fn email(&self, rng: &mut dyn RngCore, name: &PersonName) -> String;
    fn phone(&self, rng: &mut dyn RngCore) -> String;
}

#[derive(Debug, Clone)]
pub struct NameGenerator {
    /// Probability of a middle initial in the full name
    middle_initial_rate: f64,
}

impl NameGenerator {
    pub fn new() -> Self {
        NameGenerator {
            middle_initial_rate: 0.7,
        }
    }

    /// Full names never carry a middle initial
    pub fn without_middle_initials() -> Self {
        NameGenerator {
            middle_initial_rate: 0.0,
        }
    }

    pub fn supports_country(country: &str) -> bool {
        SUPPORTED_COUNTRIES
            .iter()
            .any(|c| c.eq_ignore_ascii_case(country.trim()))
    }

    fn pick<'a>(rng: &mut dyn RngCore, list: &[&'a str]) -> &'a str {
        list.choose(rng).copied().unwrap_or("")
    }

    fn first_name(rng: &mut dyn RngCore, gender: Gender) -> &'static str {
        match gender {
            Gender::Male => Self::pick(rng, FIRST_NAMES_MALE),
            Gender::Female => Self::pick(rng, FIRST_NAMES_FEMALE),
            Gender::Any => {
                let total = FIRST_NAMES_MALE.len() + FIRST_NAMES_FEMALE.len();
                let i = rng.gen_range(0..total);
                if i < FIRST_NAMES_MALE.len() {
                    FIRST_NAMES_MALE[i]
                } else {
                    FIRST_NAMES_FEMALE[i - FIRST_NAMES_MALE.len()]
                }
            }
        }
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameSource for NameGenerator {
    fn person(&self, rng: &mut dyn RngCore, gender: Gender) -> PersonName {
        let first = Self::first_name(rng, gender);
        let last = Self::pick(rng, LAST_NAMES);

        let mut parts = vec![first.to_string()];
        if rng.gen_bool(self.middle_initial_rate) {
            parts.push(format!("{}.", char::from(rng.gen_range(b'A'..=b'Z'))));
        }
        parts.push(last.to_string());

        PersonName {
            full_name: parts.join(" "),
            first_name: first.to_string(),
            last_name: last.to_string(),
        }
    }

    fn email(&self, rng: &mut dyn RngCore, name: &PersonName) -> String {
        let first = name.first_name.to_lowercase();
        let last = name.last_name.to_lowercase();
        let domain = Self::pick(rng, EMAIL_DOMAINS);

        match rng.gen_range(0..5) {
            0 => format!("{}.{}@{}", first, last, domain),
            1 => format!("{}{}@{}", first, last, domain),
            2 => format!("{}{}{}@{}", first, last, rng.gen_range(0..999), domain),
            3 => format!(
                "{}{}@{}",
                first.chars().next().map(String::from).unwrap_or_default(),
                last,
                domain
            ),
            _ => format!("{}_{}@{}", first, last, domain),
        }
    }

    fn phone(&self, rng: &mut dyn RngCore) -> String {
        format!(
            "({}) {}-{}",
            rng.gen_range(100..=999),
            rng.gen_range(100..=999),
            rng.gen_range(1000..=9999)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_gender_restricts_first_name() {
        let names = NameGenerator::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for _ in 0..100 {
            let male = names.person(&mut rng, Gender::Male);
            assert!(FIRST_NAMES_MALE.contains(&male.first_name.as_str()));

            let female = names.person(&mut rng, Gender::Female);
            assert!(FIRST_NAMES_FEMALE.contains(&female.first_name.as_str()));
        }
    }

    #[test]
    fn test_full_name_shape() {
        let names = NameGenerator::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        for _ in 0..100 {
            let person = names.person(&mut rng, Gender::Any);
            assert!(person.full_name.starts_with(&person.first_name));
            assert!(person.full_name.ends_with(&person.last_name));
            let words = person.full_name.split(' ').count();
            assert!(words == 2 || words == 3, "{}", person.full_name);
        }

        let plain = NameGenerator::without_middle_initials();
        let person = plain.person(&mut rng, Gender::Any);
        assert_eq!(
            person.full_name,
            format!("{} {}", person.first_name, person.last_name)
        );
    }

    #[test]
    fn test_email_uses_name_and_known_domain() {
        let names = NameGenerator::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for _ in 0..100 {
            let person = names.person(&mut rng, Gender::Any);
            let email = names.email(&mut rng, &person);
            let (local, domain) = email.split_once('@').unwrap();

            assert!(EMAIL_DOMAINS.contains(&domain));
            assert!(local.contains(&person.last_name.to_lowercase()));
        }
    }

    #[test]
    fn test_phone_format() {
        let names = NameGenerator::new();
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        for _ in 0..100 {
            let phone = names.phone(&mut rng);
            let bytes = phone.as_bytes();
            assert_eq!(phone.len(), 14, "{}", phone);
            assert_eq!(bytes[0], b'(');
            assert_eq!(&phone[4..6], ") ");
            assert_eq!(bytes[9], b'-');
            assert_ne!(bytes[1], b'0');
        }
    }

    #[test]
    fn test_gender_from_str() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("".parse::<Gender>().unwrap(), Gender::Any);
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn test_country_support() {
        assert!(NameGenerator::supports_country("us"));
        assert!(!NameGenerator::supports_country("FR"));
    }
}
