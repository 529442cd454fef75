use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lawdoc::config::Config;
use lawdoc::store::UserStore;
use lawdoc::{
    AssociationService, CategoryId, CategoryService, Database, DocumentFilter, DocumentId,
    DocumentService, DocumentUpdate, NewDocument, ServiceError, TagFilter, TagId, TagService,
    UserId, telemetry,
};
use serde::Serialize;

/// lawdoc - tagged traffic-law document catalogue
#[derive(Parser)]
#[command(name = "lawdoc")]
#[command(about = "Manage a hierarchy of tags and query tagged law documents")]
#[command(version)]
struct Cli {
    /// Database file (overrides LAWDOC_DATABASE_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the tag hierarchy
    #[command(subcommand)]
    Tag(TagCommand),

    /// Manage and query law documents
    #[command(subcommand)]
    Doc(DocCommand),

    /// Manage document categories
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Manage users who verify documents
    #[command(subcommand)]
    User(UserCommand),
}

#[derive(Args)]
struct PageArgs {
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Items per page
    #[arg(long, default_value_t = 20)]
    size: u32,
}

#[derive(Subcommand)]
enum TagCommand {
    /// List live tags ordered by name
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        id: Option<TagId>,
        /// Substring of the tag name
        #[arg(long)]
        name: Option<String>,
        /// Substring of the parent tag's name
        #[arg(long)]
        parent: Option<String>,
    },
    /// Show one tag with its parent and children
    Show { id: TagId },
    /// Create a tag
    Add {
        name: String,
        #[arg(long)]
        parent: Option<TagId>,
    },
    /// Rename a tag and set its parent (omit --parent to make it a root)
    Update {
        id: TagId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        parent: Option<TagId>,
    },
    /// Delete a tag, untagging its documents and detaching its children
    Delete { id: TagId },
}

#[derive(Subcommand)]
enum DocCommand {
    /// Query live documents, newest first
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        id: Option<DocumentId>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        code: Option<String>,
        /// Substring of the category name
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        verified: Option<bool>,
        /// Require this tag (repeatable; documents must carry all of them)
        #[arg(long = "tag", value_name = "TAG_ID")]
        tags: Vec<TagId>,
    },
    /// Show one document
    Show { id: DocumentId },
    /// Create a document
    Add(DocFields),
    /// Replace a document's fields; --tag values replace its tag set
    Update {
        id: DocumentId,
        #[command(flatten)]
        fields: DocFields,
        /// Keep the current tags instead of replacing them
        #[arg(long, conflicts_with = "tags")]
        keep_tags: bool,
    },
    /// Attach a tag to a document
    Tag { document: DocumentId, tag: TagId },
    /// Remove a tag from a document
    Untag { document: DocumentId, tag: TagId },
    /// Soft-delete a document (or remove it with --hard)
    Delete {
        id: DocumentId,
        #[arg(long)]
        hard: bool,
    },
    /// Mark a document verified by a user
    Verify {
        id: DocumentId,
        #[arg(long)]
        user: UserId,
    },
}

#[derive(Args)]
struct DocFields {
    #[arg(long)]
    title: String,
    #[arg(long)]
    code: String,
    #[arg(long)]
    category: Option<CategoryId>,
    #[arg(long)]
    file: Option<String>,
    #[arg(long)]
    link: Option<String>,
    #[arg(long)]
    verified: bool,
    #[arg(long = "tag", value_name = "TAG_ID")]
    tags: Vec<TagId>,
}

#[derive(Subcommand)]
enum CategoryCommand {
    /// List live categories, newest first
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        name: Option<String>,
    },
    /// Create a category
    Add { name: String },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Register a user
    Add {
        email: String,
        #[arg(long)]
        name: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    telemetry::init(&config.log_filter)?;

    let db_path = cli.database.unwrap_or(config.database_path);
    ensure_database_directory(&db_path)?;
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

    let output = execute(&cli.command, &db, &config.actor)?;
    println!("{output}");
    Ok(())
}

/// Determines if an error was caused by the caller's input (vs an internal error).
///
/// Missing entities, conflicts and invalid arguments are user errors; storage
/// and I/O failures are not.
fn is_user_error(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ServiceError>()
        .is_some_and(ServiceError::is_user_error)
}

/// Ensures the parent directory of the database file exists.
fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}

/// Runs one command against `db` and renders its result as JSON.
///
/// Separated from `run` so it can be exercised with in-memory databases.
fn execute(command: &Commands, db: &Database, actor: &str) -> Result<String> {
    match command {
        Commands::Tag(cmd) => execute_tag(cmd, db, actor),
        Commands::Doc(cmd) => execute_doc(cmd, db, actor),
        Commands::Category(cmd) => execute_category(cmd, db, actor),
        Commands::User(cmd) => execute_user(cmd, db),
    }
}

fn execute_tag(cmd: &TagCommand, db: &Database, actor: &str) -> Result<String> {
    let tags = TagService::new(db).acting_as(actor);
    match cmd {
        TagCommand::List {
            page,
            id,
            name,
            parent,
        } => {
            let filter = TagFilter {
                id: *id,
                name: name.clone(),
                parent_name: parent.clone(),
            };
            to_json(&tags.list_paginated(page.page, page.size, &filter)?)
        }
        TagCommand::Show { id } => to_json(&tags.get_by_id(*id)?),
        TagCommand::Add { name, parent } => to_json(&tags.create(name, *parent)?),
        TagCommand::Update { id, name, parent } => to_json(&tags.update(*id, name, *parent)?),
        TagCommand::Delete { id } => to_json(&tags.delete(*id)?),
    }
}

fn execute_doc(cmd: &DocCommand, db: &Database, actor: &str) -> Result<String> {
    let documents = DocumentService::new(db).acting_as(actor);
    match cmd {
        DocCommand::List {
            page,
            id,
            title,
            code,
            category,
            file,
            link,
            verified,
            tags,
        } => {
            let filter = DocumentFilter {
                id: *id,
                title: title.clone(),
                code: code.clone(),
                category_name: category.clone(),
                file_path: file.clone(),
                link_path: link.clone(),
                verified: *verified,
            };
            to_json(&documents.query_paginated(page.page, page.size, &filter, tags)?)
        }
        DocCommand::Show { id } => to_json(&documents.get_by_id(*id)?),
        DocCommand::Add(fields) => to_json(&documents.create(NewDocument {
            title: fields.title.clone(),
            code: fields.code.clone(),
            category_id: fields.category,
            file_path: fields.file.clone(),
            link_path: fields.link.clone(),
            verified: fields.verified,
            tag_ids: fields.tags.clone(),
        })?),
        DocCommand::Update {
            id,
            fields,
            keep_tags,
        } => to_json(&documents.update(
            *id,
            DocumentUpdate {
                title: fields.title.clone(),
                code: fields.code.clone(),
                category_id: fields.category,
                file_path: fields.file.clone(),
                link_path: fields.link.clone(),
                verified: fields.verified,
                tag_ids: (!keep_tags).then(|| fields.tags.clone()),
            },
        )?),
        DocCommand::Tag { document, tag } => {
            to_json(&AssociationService::new(db).add(*document, *tag)?)
        }
        DocCommand::Untag { document, tag } => {
            AssociationService::new(db).remove(*document, *tag)?;
            to_json(&documents.get_by_id(*document)?)
        }
        DocCommand::Delete { id, hard } => {
            if *hard {
                documents.delete(*id)?;
            } else {
                documents.soft_delete(*id)?;
            }
            to_json(&serde_json::json!({ "deleted": id, "hard": hard }))
        }
        DocCommand::Verify { id, user } => to_json(&documents.verify(*id, *user)?),
    }
}

fn execute_category(cmd: &CategoryCommand, db: &Database, actor: &str) -> Result<String> {
    let categories = CategoryService::new(db).acting_as(actor);
    match cmd {
        CategoryCommand::List { page, name } => {
            to_json(&categories.list_paginated(page.page, page.size, None, name.clone())?)
        }
        CategoryCommand::Add { name } => to_json(&categories.create(name)?),
    }
}

fn execute_user(cmd: &UserCommand, db: &Database) -> Result<String> {
    match cmd {
        UserCommand::Add { email, name } => {
            let email = email.trim();
            if email.is_empty() {
                return Err(ServiceError::invalid("user email cannot be empty").into());
            }
            to_json(&UserStore::new(db.connection()).create(email, name.as_deref())?)
        }
    }
}

fn to_json(value: &impl Serialize) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to render output")
}
