// Batch loader - persist a reconciled Dataset
//
// Cars go in first, in input order, each creating its Model and Make on
// demand. The ids the database hands out are written back into the arena so
// the next Car sharing that Model reuses them instead of inserting again.

use tracing::info;

use crate::db::CarRepository;
use crate::error::Result;
use crate::reconciliation::Dataset;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub cars_inserted: usize,
    /// Cars whose UUID was already in the database
    pub cars_skipped: usize,
    pub models: usize,
    pub makes: usize,
}

/// Write every car of `dataset` (and transitively its model and make) in one
/// transaction, then any model or make no car reached. On error nothing is
/// committed.
pub fn persist_dataset(repo: &CarRepository, dataset: &mut Dataset) -> Result<LoadSummary> {
    let summary = repo.transaction(|repo| {
        let mut summary = LoadSummary::default();

        for index in 0..dataset.cars.len() {
            let mut car = dataset.car(&dataset.cars[index]);

            if repo.create_car(&mut car)? {
                summary.cars_inserted += 1;
            } else {
                summary.cars_skipped += 1;
            }
            dataset.adopt_ids(index, &car);
        }

        // Models no car pointed at still belong in the database
        for id in dataset.model_ids() {
            if dataset.model_entry(id).id != 0 {
                continue;
            }
            let mut model = dataset.model(id);
            if !repo.create_model(&mut model)? {
                if let Some(existing) = repo.find_model_id(model.make.id, model.model_name())? {
                    model.id = existing;
                }
            }
            dataset.adopt_model_ids(id, &model);
        }

        // Makes whose only model key was claimed by another manufacturer
        for make in dataset.makes.iter_mut().filter(|make| make.id == 0) {
            repo.ensure_make(make)?;
        }

        summary.models = dataset.models.len();
        summary.makes = dataset.makes.len();
        Ok(summary)
    })?;

    info!(
        inserted = summary.cars_inserted,
        skipped = summary.cars_skipped,
        models = summary.models,
        makes = summary.makes,
        "dataset persisted"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Table;
    use crate::parser::tests::sample_row;
    use crate::reconciliation::{reconcile_rows, Reconciler};
    use serde_json::Value;

    const UUID_A: &str = "0b5b5d33-6a0a-4bd6-8d33-9b5b8b0b9a11";
    const UUID_B: &str = "1c6c6e44-7b1b-4ce7-9e44-ac6c9c1cab22";
    const UUID_C: &str = "2d7d7f55-8c2c-4df8-af55-bd7dad2dbc33";

    fn dataset() -> Dataset {
        let rows = vec![
            sample_row(UUID_A, "TESLA", "MODEL 3"),
            sample_row(UUID_B, "TESLA", "MODEL 3"),
            sample_row(UUID_C, "TESLA", "MODEL Y"),
        ];
        reconcile_rows(&rows).unwrap()
    }

    #[test]
    fn test_shared_entities_inserted_once() {
        let repo = CarRepository::open_in_memory().unwrap();
        let mut dataset = dataset();

        let summary = persist_dataset(&repo, &mut dataset).unwrap();

        assert_eq!(
            summary,
            LoadSummary { cars_inserted: 3, cars_skipped: 0, models: 2, makes: 1 }
        );
        assert_eq!(repo.count(Table::Makes).unwrap(), 1);
        assert_eq!(repo.count(Table::Models).unwrap(), 2);
        assert_eq!(repo.count(Table::Cars).unwrap(), 3);

        let first = dataset.car(&dataset.cars[0]);
        let second = dataset.car(&dataset.cars[1]);
        assert!(first.id > 0);
        assert_eq!(first.model.id, second.model.id);
        assert_eq!(repo.get_car_by_id(second.id).unwrap().unwrap(), second);
    }

    #[test]
    fn test_rerun_skips_existing_cars() {
        let repo = CarRepository::open_in_memory().unwrap();
        persist_dataset(&repo, &mut dataset()).unwrap();

        let summary = persist_dataset(&repo, &mut dataset()).unwrap();

        assert_eq!(summary.cars_inserted, 0);
        assert_eq!(summary.cars_skipped, 3);
        assert_eq!(repo.count(Table::Models).unwrap(), 2);
        assert_eq!(repo.count(Table::Cars).unwrap(), 3);
    }

    #[test]
    fn test_healed_model_is_what_gets_stored() {
        let mut first = sample_row(UUID_A, "NISSAN", "LEAF");
        first[18] = Value::from("0");
        let rows = vec![first, sample_row(UUID_B, "NISSAN", "LEAF")];
        let mut dataset = reconcile_rows(&rows).unwrap();
        let repo = CarRepository::open_in_memory().unwrap();

        persist_dataset(&repo, &mut dataset).unwrap();

        let models = repo.get_all_models().unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].attributes.electric_range, 266);
    }

    #[test]
    fn test_make_without_model_is_still_stored() {
        // "A_B" + "C" and "A" + "B_C" share the model key "A_B_C"
        let rows = vec![
            sample_row(UUID_A, "A_B", "C"),
            sample_row(UUID_B, "A", "B_C"),
        ];
        let mut dataset = reconcile_rows(&rows).unwrap();
        let repo = CarRepository::open_in_memory().unwrap();

        let summary = persist_dataset(&repo, &mut dataset).unwrap();

        assert_eq!(summary.makes, 2);
        assert_eq!(summary.models, 1);
        assert_eq!(repo.count(Table::Makes).unwrap(), 2);
        assert_eq!(repo.count(Table::Models).unwrap(), 1);
        assert!(dataset.makes.iter().all(|make| make.id > 0));

        let orphan = dataset.makes.iter().find(|make| make.manufacturer == "A").unwrap();
        assert_eq!(repo.find_make_id("A").unwrap(), Some(orphan.id));
        assert!(repo.get_models_by_make_id(orphan.id).unwrap().is_empty());
    }

    #[test]
    fn test_orphan_make_rerun_adopts_existing_row() {
        let rows = vec![
            sample_row(UUID_A, "A_B", "C"),
            sample_row(UUID_B, "A", "B_C"),
        ];
        let repo = CarRepository::open_in_memory().unwrap();
        persist_dataset(&repo, &mut reconcile_rows(&rows).unwrap()).unwrap();

        let mut dataset = reconcile_rows(&rows).unwrap();
        persist_dataset(&repo, &mut dataset).unwrap();

        assert_eq!(repo.count(Table::Makes).unwrap(), 2);
        assert!(dataset.makes.iter().all(|make| make.id > 0));
    }

    #[test]
    fn test_empty_dataset() {
        let repo = CarRepository::open_in_memory().unwrap();
        let mut dataset = Reconciler::new().finish();

        let summary = persist_dataset(&repo, &mut dataset).unwrap();

        assert_eq!(summary, LoadSummary::default());
    }
}
