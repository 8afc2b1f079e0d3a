//! Shared test fixtures and relation matching scenarios

use std::collections::HashMap;

use serde_json::{json, Value};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::collection::Collection;
use crate::error::{ModelError, ModelResult};
use crate::loading::eager_load;
use crate::model::{Model, RelationBag};
use crate::relations::relation::Relation;
use crate::relations::{
    without_constraints, BelongsTo, BelongsToMany, Constrained, HasMany, HasOne, Pivot,
    PIVOT_RELATION,
};

#[derive(Debug, Clone, Default)]
pub(crate) struct User {
    pub id: Option<i64>,
    pub name: String,
    pub relations: RelationBag,
}

impl User {
    pub fn with_id(id: i64, name: &str) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
            relations: RelationBag::new(),
        }
    }
}

impl Model for User {
    fn table_name() -> &'static str {
        "users"
    }

    fn set_attribute(&mut self, column: &str, value: Value) -> ModelResult<()> {
        match column {
            "id" => self.id = value.as_i64(),
            "name" => self.name = value.as_str().unwrap_or_default().to_string(),
            _ => {
                return Err(ModelError::UnknownAttribute {
                    model: Self::table_name().to_string(),
                    column: column.to_string(),
                })
            }
        }
        Ok(())
    }

    fn to_fields(&self) -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), json!(self.id));
        fields.insert("name".to_string(), json!(self.name));
        fields
    }

    fn from_row(row: &PgRow) -> ModelResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            relations: RelationBag::new(),
        })
    }

    fn relations(&self) -> &RelationBag {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut RelationBag {
        &mut self.relations
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Post {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub title: String,
    pub relations: RelationBag,
}

impl Post {
    pub fn with_keys(id: i64, user_id: Option<i64>, title: &str) -> Self {
        Self {
            id: Some(id),
            user_id,
            title: title.to_string(),
            relations: RelationBag::new(),
        }
    }
}

impl Model for Post {
    fn table_name() -> &'static str {
        "posts"
    }

    fn set_attribute(&mut self, column: &str, value: Value) -> ModelResult<()> {
        match column {
            "id" => self.id = value.as_i64(),
            "user_id" => self.user_id = value.as_i64(),
            "title" => self.title = value.as_str().unwrap_or_default().to_string(),
            _ => {
                return Err(ModelError::UnknownAttribute {
                    model: Self::table_name().to_string(),
                    column: column.to_string(),
                })
            }
        }
        Ok(())
    }

    fn to_fields(&self) -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), json!(self.id));
        fields.insert("user_id".to_string(), json!(self.user_id));
        fields.insert("title".to_string(), json!(self.title));
        fields
    }

    fn from_row(row: &PgRow) -> ModelResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            relations: RelationBag::new(),
        })
    }

    fn relations(&self) -> &RelationBag {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut RelationBag {
        &mut self.relations
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Profile {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub bio: String,
    pub relations: RelationBag,
}

impl Profile {
    pub fn with_keys(id: i64, user_id: Option<i64>, bio: &str) -> Self {
        Self {
            id: Some(id),
            user_id,
            bio: bio.to_string(),
            relations: RelationBag::new(),
        }
    }
}

impl Model for Profile {
    fn table_name() -> &'static str {
        "profiles"
    }

    fn set_attribute(&mut self, column: &str, value: Value) -> ModelResult<()> {
        match column {
            "id" => self.id = value.as_i64(),
            "user_id" => self.user_id = value.as_i64(),
            "bio" => self.bio = value.as_str().unwrap_or_default().to_string(),
            _ => {
                return Err(ModelError::UnknownAttribute {
                    model: Self::table_name().to_string(),
                    column: column.to_string(),
                })
            }
        }
        Ok(())
    }

    fn to_fields(&self) -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), json!(self.id));
        fields.insert("user_id".to_string(), json!(self.user_id));
        fields.insert("bio".to_string(), json!(self.bio));
        fields
    }

    fn from_row(row: &PgRow) -> ModelResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            bio: row.try_get("bio")?,
            relations: RelationBag::new(),
        })
    }

    fn relations(&self) -> &RelationBag {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut RelationBag {
        &mut self.relations
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Role {
    pub id: Option<i64>,
    pub name: String,
    pub relations: RelationBag,
}

impl Role {
    pub fn with_id(id: i64, name: &str) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
            relations: RelationBag::new(),
        }
    }

    pub fn unsaved(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            relations: RelationBag::new(),
        }
    }
}

impl Model for Role {
    fn table_name() -> &'static str {
        "roles"
    }

    fn set_attribute(&mut self, column: &str, value: Value) -> ModelResult<()> {
        match column {
            "id" => self.id = value.as_i64(),
            "name" => self.name = value.as_str().unwrap_or_default().to_string(),
            _ => {
                return Err(ModelError::UnknownAttribute {
                    model: Self::table_name().to_string(),
                    column: column.to_string(),
                })
            }
        }
        Ok(())
    }

    fn to_fields(&self) -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), json!(self.id));
        fields.insert("name".to_string(), json!(self.name));
        fields
    }

    fn from_row(row: &PgRow) -> ModelResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            relations: RelationBag::new(),
        })
    }

    fn relations(&self) -> &RelationBag {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut RelationBag {
        &mut self.relations
    }
}

fn posts_relation(parent: User) -> HasMany<User, Post> {
    HasMany::unconstrained(parent, "user_id", "id")
}

#[test]
fn has_many_matching_distributes_and_seeds_empty() {
    let mut parents = vec![User::with_id(1, "alice"), User::with_id(2, "bob")];
    let results = Collection::from_vec(vec![
        Post::with_keys(10, Some(1), "first"),
        Post::with_keys(11, Some(1), "second"),
        Post::with_keys(12, Some(1), "third"),
    ]);

    let relation = posts_relation(parents[0].clone());
    relation.init_relation(&mut parents, "posts");
    relation.match_related(&mut parents, results, "posts");

    let alice_posts = parents[0]
        .relations()
        .get::<Collection<Post>>("posts")
        .unwrap();
    assert_eq!(alice_posts.len(), 3);
    // Result order is preserved within a parent's bucket
    let ids: Vec<Option<i64>> = alice_posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![Some(10), Some(11), Some(12)]);

    // A parent with no related rows still has the relation resolved, as an
    // empty collection rather than an absent entry
    let bob_posts = parents[1]
        .relations()
        .get::<Collection<Post>>("posts")
        .unwrap();
    assert!(bob_posts.is_empty());
    assert!(parents[1].relations().is_loaded("posts"));
}

#[test]
fn has_many_matching_is_idempotent() {
    let mut parents = vec![User::with_id(1, "alice")];
    let results = Collection::from_vec(vec![Post::with_keys(10, Some(1), "first")]);

    let relation = posts_relation(parents[0].clone());
    relation.init_relation(&mut parents, "posts");
    relation.match_related(&mut parents, results.clone(), "posts");
    relation.match_related(&mut parents, results, "posts");

    let posts = parents[0]
        .relations()
        .get::<Collection<Post>>("posts")
        .unwrap();
    assert_eq!(posts.len(), 1);
}

#[test]
fn has_many_skips_null_foreign_keys() {
    let mut parents = vec![User::with_id(1, "alice")];
    let results = Collection::from_vec(vec![
        Post::with_keys(10, Some(1), "kept"),
        Post::with_keys(11, None, "orphan"),
    ]);

    let relation = posts_relation(parents[0].clone());
    relation.init_relation(&mut parents, "posts");
    relation.match_related(&mut parents, results, "posts");

    let posts = parents[0]
        .relations()
        .get::<Collection<Post>>("posts")
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts.first().and_then(|p| p.id), Some(10));
}

#[test]
fn has_one_takes_first_row_in_result_order() {
    let mut parents = vec![User::with_id(1, "alice")];
    let results = Collection::from_vec(vec![
        Profile::with_keys(21, Some(1), "newer"),
        Profile::with_keys(20, Some(1), "older"),
    ]);

    let relation: HasOne<User, Profile> = HasOne::unconstrained(parents[0].clone(), "user_id", "id");
    relation.init_relation(&mut parents, "profile");
    relation.match_related(&mut parents, results, "profile");

    let profile = parents[0]
        .relations()
        .get::<Option<Profile>>("profile")
        .unwrap();
    assert_eq!(profile.as_ref().and_then(|p| p.id), Some(21));
}

#[test]
fn has_one_seeds_none_for_parent_without_row() {
    let mut parents = vec![User::with_id(1, "alice")];

    let relation: HasOne<User, Profile> = HasOne::unconstrained(parents[0].clone(), "user_id", "id");
    relation.init_relation(&mut parents, "profile");
    relation.match_related(&mut parents, Collection::new(), "profile");

    let profile = parents[0]
        .relations()
        .get::<Option<Profile>>("profile")
        .unwrap();
    assert!(profile.is_none());
}

#[test]
fn has_many_constrained_query_scopes_to_parent_key() {
    let relation = HasMany::<User, Post>::new(User::with_id(7, "gina"), "user_id", "id");
    let sql = relation.query().to_sql();

    assert_eq!(
        sql,
        "SELECT * FROM posts WHERE posts.user_id = 7 AND posts.user_id IS NOT NULL"
    );
}

#[test]
fn has_many_eager_constraints_use_unique_non_null_keys() {
    let parents = vec![
        User::with_id(1, "alice"),
        User::with_id(2, "bob"),
        User::with_id(1, "alice again"),
        User {
            id: None,
            name: "unsaved".to_string(),
            relations: RelationBag::new(),
        },
    ];

    let mut relation = posts_relation(parents[0].clone());
    relation.add_eager_constraints(&parents);

    assert_eq!(
        relation.query().to_sql(),
        "SELECT * FROM posts WHERE posts.user_id IN (1, 2)"
    );
}

#[test]
fn belongs_to_matching_attaches_owner_per_child() {
    let mut children = vec![
        Post::with_keys(10, Some(1), "a"),
        Post::with_keys(11, Some(2), "b"),
        Post::with_keys(12, None, "orphan"),
    ];
    let owners = Collection::from_vec(vec![User::with_id(1, "alice"), User::with_id(2, "bob")]);

    let relation: BelongsTo<Post, User> =
        BelongsTo::unconstrained(children[0].clone(), "user_id", "id", "user");
    relation.init_relation(&mut children, "user");
    relation.match_related(&mut children, owners, "user");

    let first = children[0].relations().get::<Option<User>>("user").unwrap();
    assert_eq!(first.as_ref().map(|u| u.name.as_str()), Some("alice"));

    let second = children[1].relations().get::<Option<User>>("user").unwrap();
    assert_eq!(second.as_ref().map(|u| u.name.as_str()), Some("bob"));

    // The null-key child keeps its seeded None
    let orphan = children[2].relations().get::<Option<User>>("user").unwrap();
    assert!(orphan.is_none());
}

#[test]
fn belongs_to_eager_constraints_collect_child_foreign_keys() {
    let children = vec![
        Post::with_keys(10, Some(3), "a"),
        Post::with_keys(11, Some(4), "b"),
        Post::with_keys(12, Some(3), "c"),
    ];

    let mut relation: BelongsTo<Post, User> =
        BelongsTo::unconstrained(children[0].clone(), "user_id", "id", "user");
    relation.add_eager_constraints(&children);

    assert_eq!(
        relation.query().to_sql(),
        "SELECT * FROM users WHERE users.id IN (3, 4)"
    );
}

#[test]
fn belongs_to_associate_sets_key_and_caches_owner() {
    let mut post = Post::with_keys(10, None, "draft");
    let owner = User::with_id(5, "carol");

    let relation: BelongsTo<Post, User> = BelongsTo::new(post.clone(), "user_id", "id", "user");
    relation.associate(&mut post, &owner).unwrap();

    assert_eq!(post.user_id, Some(5));
    let cached = post.relations().get::<Option<User>>("user").unwrap();
    assert_eq!(cached.as_ref().and_then(|u| u.id), Some(5));
}

#[test]
fn belongs_to_associate_rejects_owner_without_key() {
    let mut post = Post::with_keys(10, None, "draft");
    let owner = User {
        id: None,
        name: "unsaved".to_string(),
        relations: RelationBag::new(),
    };

    let relation: BelongsTo<Post, User> = BelongsTo::new(post.clone(), "user_id", "id", "user");
    let result = relation.associate(&mut post, &owner);

    assert!(matches!(
        result,
        Err(ModelError::IncompatibleAssociation { .. })
    ));
    assert_eq!(post.user_id, None);
}

#[test]
fn belongs_to_associate_id_evicts_stale_cache() {
    let mut post = Post::with_keys(10, Some(5), "draft");
    post.relations_mut()
        .set("user", Some(User::with_id(5, "carol")));

    let relation: BelongsTo<Post, User> = BelongsTo::new(post.clone(), "user_id", "id", "user");
    relation.associate_id(&mut post, json!(6)).unwrap();

    assert_eq!(post.user_id, Some(6));
    assert!(!post.relations().is_loaded("user"));
}

#[test]
fn belongs_to_dissociate_nulls_key_and_caches_absence() {
    let mut post = Post::with_keys(10, Some(5), "draft");
    post.relations_mut()
        .set("user", Some(User::with_id(5, "carol")));

    let relation: BelongsTo<Post, User> = BelongsTo::new(post.clone(), "user_id", "id", "user");
    relation.dissociate(&mut post).unwrap();

    assert_eq!(post.user_id, None);
    let cached = post.relations().get::<Option<User>>("user").unwrap();
    assert!(cached.is_none());
}

#[test]
fn belongs_to_many_constrained_query_joins_through_pivot() {
    let relation = BelongsToMany::<User, Role>::new(
        User::with_id(7, "gina"),
        "role_user",
        "user_id",
        "role_id",
        "id",
        "id",
    );

    assert_eq!(
        relation.query().to_sql(),
        "SELECT * FROM roles INNER JOIN role_user ON roles.id = role_user.role_id \
         WHERE role_user.user_id = 7"
    );
}

#[test]
fn belongs_to_many_eager_constraints_scope_pivot_foreign_key() {
    let parents = vec![User::with_id(1, "alice"), User::with_id(2, "bob")];
    let mut relation = BelongsToMany::<User, Role>::unconstrained(
        parents[0].clone(),
        "role_user",
        "user_id",
        "role_id",
        "id",
        "id",
    );
    relation.add_eager_constraints(&parents);

    assert_eq!(
        relation.query().to_sql(),
        "SELECT * FROM roles INNER JOIN role_user ON roles.id = role_user.role_id \
         WHERE role_user.user_id IN (1, 2)"
    );
}

#[test]
fn belongs_to_eager_constraints_with_only_null_keys_match_nothing() {
    let children = vec![
        Post::with_keys(10, None, "a"),
        Post::with_keys(11, None, "b"),
    ];

    let mut relation: BelongsTo<Post, User> =
        BelongsTo::unconstrained(children[0].clone(), "user_id", "id", "user");
    relation.add_eager_constraints(&children);

    // The generated filter stays valid SQL and can never match a row, so
    // every orphan keeps its seeded None
    assert_eq!(
        relation.query().to_sql(),
        "SELECT * FROM users WHERE 1 = 0"
    );
}

fn role_pivot(user_id: i64, role_id: i64) -> Pivot {
    Pivot {
        table: "role_user".to_string(),
        foreign_pivot_key: "user_id".to_string(),
        related_pivot_key: "role_id".to_string(),
        foreign_value: json!(user_id),
        related_value: json!(role_id),
        attributes: HashMap::new(),
        created_at: None,
        updated_at: None,
    }
}

#[test]
fn belongs_to_many_matching_buckets_by_pivot_foreign_key() {
    let mut parents = vec![
        User::with_id(1, "alice"),
        User::with_id(2, "bob"),
        User::with_id(3, "carl"),
    ];

    let mut admin = Role::with_id(10, "admin");
    admin.relations_mut().set(PIVOT_RELATION, role_pivot(1, 10));
    let mut editor = Role::with_id(11, "editor");
    editor.relations_mut().set(PIVOT_RELATION, role_pivot(1, 11));
    let mut viewer = Role::with_id(12, "viewer");
    viewer.relations_mut().set(PIVOT_RELATION, role_pivot(2, 12));
    // A joined row without a hydrated pivot cannot be bucketed
    let stray = Role::with_id(13, "stray");

    let relation = BelongsToMany::<User, Role>::unconstrained(
        parents[0].clone(),
        "role_user",
        "user_id",
        "role_id",
        "id",
        "id",
    );
    let results = Collection::from_vec(vec![admin, editor, viewer, stray]);
    relation.init_relation(&mut parents, "roles");
    relation.match_related(&mut parents, results, "roles");

    let alice_roles = parents[0]
        .relations()
        .get::<Collection<Role>>("roles")
        .unwrap();
    let ids: Vec<Option<i64>> = alice_roles.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![Some(10), Some(11)]);

    let bob_roles = parents[1]
        .relations()
        .get::<Collection<Role>>("roles")
        .unwrap();
    assert_eq!(bob_roles.first().and_then(|r| r.id), Some(12));
    assert_eq!(bob_roles.len(), 1);

    // A parent with no pivot rows keeps the seeded empty collection
    let carl_roles = parents[2]
        .relations()
        .get::<Collection<Role>>("roles")
        .unwrap();
    assert!(carl_roles.is_empty());
    assert!(parents[2].relations().is_loaded("roles"));
}

#[tokio::test]
async fn eager_load_with_no_parents_runs_no_query() {
    // A lazy pool never connects; the empty-parents short circuit must
    // return before anything touches it
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .unwrap();

    let mut parents: Vec<User> = Vec::new();
    let mut relation = posts_relation(User::with_id(1, "alice"));

    let result = eager_load(&mut relation, &mut parents, "posts", &pool).await;
    assert!(result.is_ok());
}

#[test]
fn unconstrained_relation_starts_without_scoping() {
    let relation = posts_relation(User::with_id(1, "alice"));
    assert_eq!(relation.query().to_sql(), "SELECT * FROM posts");
}

#[test]
fn without_constraints_suppresses_and_restores() {
    let mut relation = HasMany::<User, Post>::new(User::with_id(1, "alice"), "user_id", "id");
    assert!(relation.constraints_enabled());

    let enabled_inside = without_constraints(&mut relation, |r| r.constraints_enabled());
    assert!(!enabled_inside);
    assert!(relation.constraints_enabled());
}

#[test]
fn relation_queries_clone_independently() {
    let relation = HasMany::<User, Post>::new(User::with_id(1, "alice"), "user_id", "id");
    let modified = relation.query().clone().where_eq("title", json!("x"));

    assert_ne!(relation.query().to_sql(), modified.to_sql());
}

#[test]
fn collection_pluck_and_unique_and_union() {
    let posts = Collection::from_vec(vec![
        Post::with_keys(1, Some(1), "a"),
        Post::with_keys(2, Some(1), "b"),
        Post::with_keys(1, Some(2), "a dup"),
    ]);

    assert_eq!(posts.pluck("id"), vec![json!(1), json!(2), json!(1)]);

    let unique = posts.clone().unique();
    assert_eq!(unique.len(), 2);
    // First occurrence wins
    assert_eq!(unique.first().map(|p| p.title.as_str()), Some("a"));

    let more = Collection::from_vec(vec![Post::with_keys(3, Some(2), "c")]);
    let combined = posts.union(more);
    assert_eq!(combined.len(), 4);
}

#[test]
fn set_attribute_rejects_undeclared_columns() {
    let mut user = User::with_id(1, "alice");
    let result = user.set_attribute("nickname", json!("al"));

    assert!(matches!(
        result,
        Err(ModelError::UnknownAttribute { .. })
    ));
}

#[test]
fn primary_key_filters_null() {
    let user = User {
        id: None,
        name: "unsaved".to_string(),
        relations: RelationBag::new(),
    };
    assert!(user.primary_key().is_none());
    assert_eq!(User::with_id(9, "ida").primary_key(), Some(json!(9)));
}
