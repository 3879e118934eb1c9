//! Built-in recipes shipped with every install. Read-only at runtime.

use std::sync::LazyLock;

use crate::models::{Difficulty, Recipe};

struct Builtin {
    id: &'static str,
    title: &'static str,
    image: &'static str,
    difficulty: Difficulty,
    prep_time: u32,
    servings: u32,
    categories: &'static [&'static str],
    ingredients: &'static [&'static str],
    instructions: &'static [&'static str],
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
}

const BUILTINS: &[Builtin] = &[
    Builtin {
        id: "1",
        title: "Greek Yogurt Parfait",
        image: "https://images.unsplash.com/photo-1488477181946-6428a0291777?w=800&auto=format",
        difficulty: Difficulty::Easy,
        prep_time: 5,
        servings: 1,
        categories: &["breakfast", "vegetarian", "high-protein"],
        ingredients: &[
            "200g Greek yogurt",
            "50g mixed berries",
            "30g granola",
            "1 tsp honey",
        ],
        instructions: &[
            "Spoon half the yogurt into a glass.",
            "Add a layer of berries and granola.",
            "Repeat the layers and drizzle with honey.",
        ],
        calories: 320.0,
        protein: 22.0,
        carbs: 38.0,
        fat: 8.0,
    },
    Builtin {
        id: "2",
        title: "Quinoa Salad with Chickpeas",
        image: "https://images.unsplash.com/photo-1512621776951-a57141f2eefd?w=800&auto=format",
        difficulty: Difficulty::Easy,
        prep_time: 20,
        servings: 2,
        categories: &["lunch", "vegan", "gluten-free"],
        ingredients: &[
            "150g quinoa",
            "1 can chickpeas",
            "1 cucumber",
            "200g cherry tomatoes",
            "2 tbsp olive oil",
            "1 lemon",
        ],
        instructions: &[
            "Rinse and cook the quinoa, then let it cool.",
            "Drain the chickpeas and chop the vegetables.",
            "Toss everything with olive oil and lemon juice.",
        ],
        calories: 450.0,
        protein: 16.0,
        carbs: 58.0,
        fat: 17.0,
    },
    Builtin {
        id: "3",
        title: "Grilled Salmon with Vegetables",
        image: "https://images.unsplash.com/photo-1467003909585-2f8a72700288?w=800&auto=format",
        difficulty: Difficulty::Medium,
        prep_time: 30,
        servings: 2,
        categories: &["dinner", "high-protein", "gluten-free"],
        ingredients: &[
            "2 salmon fillets",
            "1 zucchini",
            "1 red bell pepper",
            "1 tbsp olive oil",
            "1 garlic clove",
        ],
        instructions: &[
            "Heat the grill and brush the salmon with oil.",
            "Slice the vegetables and season with garlic.",
            "Grill the salmon 4 minutes per side alongside the vegetables.",
        ],
        calories: 520.0,
        protein: 40.0,
        carbs: 12.0,
        fat: 34.0,
    },
    Builtin {
        id: "4",
        title: "Overnight Oats",
        image: "https://images.unsplash.com/photo-1517673400267-0251440c45dc?w=800&auto=format",
        difficulty: Difficulty::Easy,
        prep_time: 10,
        servings: 1,
        categories: &["breakfast", "vegetarian"],
        ingredients: &[
            "50g rolled oats",
            "150ml milk",
            "1 tbsp chia seeds",
            "1 banana",
        ],
        instructions: &[
            "Combine oats, milk, and chia seeds in a jar.",
            "Refrigerate overnight.",
            "Top with sliced banana before serving.",
        ],
        calories: 380.0,
        protein: 13.0,
        carbs: 60.0,
        fat: 10.0,
    },
    Builtin {
        id: "5",
        title: "Chicken Stir-Fry",
        image: "https://images.unsplash.com/photo-1603133872878-684f208fb84b?w=800&auto=format",
        difficulty: Difficulty::Medium,
        prep_time: 25,
        servings: 3,
        categories: &["dinner", "high-protein"],
        ingredients: &[
            "400g chicken breast",
            "1 broccoli head",
            "1 carrot",
            "2 tbsp soy sauce",
            "1 tbsp sesame oil",
            "1 tsp grated ginger",
        ],
        instructions: &[
            "Cut the chicken into strips and the vegetables into bite-size pieces.",
            "Stir-fry the chicken in sesame oil until golden.",
            "Add vegetables, ginger, and soy sauce and cook 5 more minutes.",
        ],
        calories: 410.0,
        protein: 45.0,
        carbs: 18.0,
        fat: 16.0,
    },
    Builtin {
        id: "6",
        title: "Hummus and Veggie Sticks",
        image: "https://images.unsplash.com/photo-1541518763669-27fef04b14ea?w=800&auto=format",
        difficulty: Difficulty::Easy,
        prep_time: 10,
        servings: 2,
        categories: &["snacks", "vegan", "gluten-free"],
        ingredients: &[
            "150g hummus",
            "2 carrots",
            "1 cucumber",
            "1 celery stalk",
        ],
        instructions: &[
            "Cut the vegetables into sticks.",
            "Serve with hummus for dipping.",
        ],
        calories: 210.0,
        protein: 7.0,
        carbs: 22.0,
        fat: 11.0,
    },
    Builtin {
        id: "7",
        title: "Lentil Soup",
        image: "https://images.unsplash.com/photo-1547592166-23ac45744acd?w=800&auto=format",
        difficulty: Difficulty::Medium,
        prep_time: 45,
        servings: 4,
        categories: &["lunch", "vegan", "high-fiber"],
        ingredients: &[
            "250g red lentils",
            "1 onion",
            "2 carrots",
            "1 can chopped tomatoes",
            "1 l vegetable stock",
            "1 tsp cumin",
        ],
        instructions: &[
            "Soften the onion and carrots in a large pot.",
            "Add lentils, tomatoes, stock, and cumin.",
            "Simmer for 30 minutes and blend until smooth.",
        ],
        calories: 290.0,
        protein: 18.0,
        carbs: 45.0,
        fat: 3.0,
    },
    Builtin {
        id: "8",
        title: "Beef and Broccoli Bowl",
        image: "https://images.unsplash.com/photo-1504674900247-0877df9cc836?w=800&auto=format",
        difficulty: Difficulty::Hard,
        prep_time: 40,
        servings: 2,
        categories: &["dinner", "high-protein"],
        ingredients: &[
            "300g flank steak",
            "1 broccoli head",
            "150g brown rice",
            "3 tbsp oyster sauce",
            "1 tbsp cornstarch",
        ],
        instructions: &[
            "Cook the rice.",
            "Slice the steak thinly and toss in cornstarch.",
            "Sear the steak, add broccoli and oyster sauce, and serve over rice.",
        ],
        calories: 610.0,
        protein: 42.0,
        carbs: 62.0,
        fat: 20.0,
    },
];

static CATALOG: LazyLock<Vec<Recipe>> = LazyLock::new(|| {
    BUILTINS
        .iter()
        .map(|b| Recipe {
            id: b.id.to_string(),
            title: b.title.to_string(),
            image: b.image.to_string(),
            difficulty: b.difficulty,
            prep_time: b.prep_time,
            servings: b.servings,
            categories: b.categories.iter().map(ToString::to_string).collect(),
            ingredients: b.ingredients.iter().map(ToString::to_string).collect(),
            instructions: b.instructions.iter().map(ToString::to_string).collect(),
            calories: b.calories,
            protein: b.protein,
            carbs: b.carbs,
            fat: b.fat,
        })
        .collect()
});

#[must_use]
pub fn builtin_recipes() -> &'static [Recipe] {
    &CATALOG
}

#[must_use]
pub fn find_builtin(id: &str) -> Option<&'static Recipe> {
    CATALOG.iter().find(|r| r.id == id)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::models::{NewRecipe, validate_new_recipe};

    #[test]
    fn test_catalog_has_at_least_six_entries() {
        assert!(builtin_recipes().len() >= 6);
    }

    #[test]
    fn test_catalog_ids_unique_and_not_user_prefixed() {
        let ids: HashSet<&str> = builtin_recipes().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), builtin_recipes().len());
        assert!(builtin_recipes().iter().all(|r| !r.is_user_created()));
    }

    #[test]
    fn test_catalog_entries_are_well_formed() {
        for recipe in builtin_recipes() {
            let as_new = NewRecipe::from(recipe.clone());
            assert!(
                validate_new_recipe(&as_new).is_ok(),
                "built-in {} failed validation",
                recipe.id
            );
        }
    }

    #[test]
    fn test_find_builtin() {
        assert_eq!(find_builtin("1").unwrap().title, "Greek Yogurt Parfait");
        assert!(find_builtin("999").is_none());
        assert!(find_builtin("user-recipe-1").is_none());
    }
}
