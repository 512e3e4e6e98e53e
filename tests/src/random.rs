use {
    anyhow::Result,
    fs_err::write,
    rand::{
        Rng,
        distr::{Alphanumeric, SampleString, weighted::WeightedIndex},
        prelude::Distribution,
        rng,
        seq::IndexedRandom,
    },
    sealzip_protocol::{Content, FILENAME_ATTRIBUTE, Password, WorkItem},
    std::path::Path,
};

/// What a generated invocation is expected to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Delivered,
    /// Processed with an empty password.
    ArchiveBuildFails,
    /// Content points to a file that doesn't exist.
    StagingFails,
    /// No work item at all.
    Idle,
}

#[derive(Debug)]
pub struct Case {
    pub item: Option<WorkItem>,
    pub expectation: Expectation,
}

pub fn random_name() -> Option<String> {
    let mut rng = rng();
    match rng.random_range(0..10) {
        0 => None,
        1 => Some(String::new()),
        2 => Some(format!(".{}", Alphanumeric.sample_string(&mut rng, 5))),
        3 => Some(format!("{}.", Alphanumeric.sample_string(&mut rng, 5))),
        4 => Some(
            ["report.v2.csv", "archive.tar.gz", "noext", "dir/inner.txt", "space name.md"]
                .choose(&mut rng)
                .map_or_else(String::new, |name| (*name).to_owned()),
        ),
        _ => {
            let stem_len = rng.random_range(1..=12);
            let ext_len = rng.random_range(1..=4);
            Some(format!(
                "{}.{}",
                Alphanumeric.sample_string(&mut rng, stem_len),
                Alphanumeric.sample_string(&mut rng, ext_len),
            ))
        }
    }
}

pub fn random_content() -> Vec<u8> {
    let mut rng = rng();
    let len = if rng.random_bool(0.1) {
        0
    } else {
        rng.random_range(1..=200_000)
    };
    if rng.random_bool(0.5) {
        // Compressible.
        Alphanumeric.sample_string(&mut rng, len).into_bytes()
    } else {
        (0..len).map(|_| rng.random::<u8>()).collect()
    }
}

pub fn random_password() -> Password {
    let len = rng().random_range(1..=40);
    Alphanumeric.sample_string(&mut rng(), len).into()
}

pub fn random_case(dir: &Path) -> Result<Case> {
    let expectations: &[(Expectation, i32)] = &[
        (Expectation::Delivered, 20),
        (Expectation::ArchiveBuildFails, 3),
        (Expectation::StagingFails, 3),
        (Expectation::Idle, 2),
    ];
    let distribution = WeightedIndex::new(expectations.iter().map(|(_, w)| w))?;
    let expectation = expectations[distribution.sample(&mut rng())].0;
    if expectation == Expectation::Idle {
        return Ok(Case {
            item: None,
            expectation,
        });
    }

    let file_name = format!("content_{}", Alphanumeric.sample_string(&mut rng(), 16));
    let content = if expectation == Expectation::StagingFails {
        Content::File(dir.join(file_name))
    } else if rng().random_bool(0.5) {
        let path = dir.join(file_name);
        write(&path, random_content())?;
        Content::File(path)
    } else {
        random_content().into()
    };
    let mut item = WorkItem::new(content);
    if let Some(name) = random_name() {
        item = item.with_attribute(FILENAME_ATTRIBUTE, name);
    }
    if rng().random_bool(0.3) {
        item = item.with_attribute("uuid", Alphanumeric.sample_string(&mut rng(), 32));
    }
    Ok(Case {
        item: Some(item),
        expectation,
    })
}
