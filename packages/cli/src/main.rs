mod client;
mod session;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use common::{RecipeSortField, Score, SortOrder};
use console::style;
use serde_json::{Map, Value};

use crate::client::{ApiClient, NewIngredient, NewIngredientLine, NewRecipe, RecipeFilter};
use crate::session::{Session, SessionStore};

#[derive(Parser)]
#[command(name = "recipebox")]
#[command(about = "RecipeBox CLI", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(
        long,
        global = true,
        env = "RECIPEBOX_SERVER",
        default_value = "http://localhost:3000"
    )]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long, env = "RECIPEBOX_PASSWORD")]
        password: String,
    },
    /// Log in and store the session
    Login {
        /// Username or email
        username: String,
        #[arg(long, env = "RECIPEBOX_PASSWORD")]
        password: String,
    },
    /// Discard the stored session
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Change the password of the logged-in account
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    /// Delete an account with everything it owns
    DeleteAccount {
        /// Account to delete (admins only); defaults to your own
        #[arg(long)]
        user_id: Option<i32>,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Browse and manage recipes
    #[command(subcommand)]
    Recipes(RecipeCommands),
    /// Browse and manage ingredients
    #[command(subcommand)]
    Ingredients(IngredientCommands),
    /// Rate a recipe from 1 to 5
    Rate {
        recipe_id: i32,
        score: i64,
        #[arg(long)]
        review: Option<String>,
    },
    /// List the ratings of a recipe
    Ratings { recipe_id: i32 },
    /// Save a recipe to your list
    Save { recipe_id: i32 },
    /// Remove a recipe from your list
    Unsave { recipe_id: i32 },
    /// List your saved recipes
    Saved,
    /// Show or edit profiles
    #[command(subcommand)]
    Profile(ProfileCommands),
    /// Site statistics (admins only)
    Stats {
        /// Only print one total
        #[arg(value_enum)]
        total: Option<Total>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Total {
    Users,
    Admins,
    Recipes,
}

impl Total {
    fn path_segment(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Admins => "admins",
            Self::Recipes => "recipes",
        }
    }
}

#[derive(Subcommand)]
enum RecipeCommands {
    List(ListArgs),
    Show {
        recipe_id: i32,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        instructions: String,
        /// Minutes
        #[arg(long)]
        time: i32,
        /// Ingredient line as `ID:QUANTITY`, e.g. `3:200 g`. Repeatable.
        #[arg(long = "ingredient", value_parser = parse_ingredient_line)]
        ingredients: Vec<NewIngredientLine>,
    },
    Delete {
        recipe_id: i32,
    },
    /// Approve a recipe (admins only)
    Approve {
        recipe_id: i32,
        /// Withdraw approval instead
        #[arg(long)]
        revoke: bool,
    },
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    page: Option<u64>,
    #[arg(long)]
    per_page: Option<u64>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    approved: Option<bool>,
    #[arg(long)]
    user_id: Option<i32>,
    /// created_at, name, average_rating or time_to_make
    #[arg(long)]
    sort_by: Option<RecipeSortField>,
    /// asc or desc
    #[arg(long)]
    sort_order: Option<SortOrder>,
}

#[derive(Subcommand)]
enum IngredientCommands {
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Add an ingredient (admins only)
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        allergen: bool,
        #[arg(long)]
        nutrition: Option<String>,
    },
    /// Ingredients of one recipe
    ForRecipe { recipe_id: i32 },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show a profile; defaults to your own
    Show { user_id: Option<i32> },
    /// Update your profile. Pass an empty string to clear a field.
    Set {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        pronouns: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
}

fn parse_ingredient_line(raw: &str) -> Result<NewIngredientLine, String> {
    let (id, quantity) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected ID:QUANTITY, got '{raw}'"))?;
    let ingredient_id = id
        .trim()
        .parse()
        .map_err(|_| format!("'{id}' is not an ingredient ID"))?;
    let quantity = quantity.trim();
    if quantity.is_empty() {
        return Err("quantity must not be empty".into());
    }
    Ok(NewIngredientLine {
        ingredient_id,
        quantity: quantity.to_string(),
    })
}

/// Build a profile update body: unset flags are omitted, empty strings become `null`.
fn profile_update_body(fields: [(&str, Option<String>); 4]) -> Value {
    let mut body = Map::new();
    for (key, value) in fields {
        match value {
            Some(v) if v.trim().is_empty() && key != "display_name" => {
                body.insert(key.into(), Value::Null);
            }
            Some(v) => {
                body.insert(key.into(), Value::String(v));
            }
            None => {}
        }
    }
    Value::Object(body)
}

struct App {
    server: String,
    store: SessionStore,
    session: Option<Session>,
}

impl App {
    fn client(&self) -> ApiClient {
        ApiClient::new(&self.server, self.session.as_ref().map(|s| s.token.clone()))
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .context("Not logged in; run `recipebox login` first")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = SessionStore::default_location()?;
    let session = session_for_server(store.load()?, &cli.server);
    let app = App {
        server: cli.server,
        store,
        session,
    };

    run(&app, cli.command)
}

/// Keeps the stored session only when it was issued by `server`, so its
/// token is never sent to another host.
fn session_for_server(session: Option<Session>, server: &str) -> Option<Session> {
    let session = session?;
    if same_server(&session.server, server) {
        return Some(session);
    }
    eprintln!(
        "{} ignoring session for {}; not logged in to {}",
        style("warning:").yellow().bold(),
        session.server,
        server
    );
    None
}

fn same_server(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

fn run(ctx: &App, command: Commands) -> Result<()> {
    let api = ctx.client();

    match command {
        Commands::Signup {
            email,
            username,
            display_name,
            password,
        } => {
            let user = api.signup(&email, &username, display_name.as_deref(), &password)?;
            println!(
                "{} account {} (id {})",
                style("Created").green(),
                style(&user.username).bold(),
                user.id
            );
        }
        Commands::Login { username, password } => {
            let res = api.login(&username, &password)?;
            let session = Session {
                server: ctx.server.clone(),
                token: res.token,
                expires_at: res.expires_at,
                user_id: res.user.id,
                username: res.user.username,
                is_admin: res.user.is_admin,
            };
            ctx.store.save(&session)?;
            println!(
                "Logged in as {} until {}",
                style(&session.username).bold(),
                session.expires_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        Commands::Logout => {
            if ctx.store.clear()? {
                println!("Logged out");
            } else {
                println!("No session to discard");
            }
        }
        Commands::Whoami => {
            let user = api.me()?;
            println!("{} <{}>", style(&user.username).bold(), user.email);
            println!("  id:           {}", user.id);
            println!("  display name: {}", user.display_name);
            println!("  admin:        {}", user.is_admin);
            println!("  member since: {}", user.created_at.format("%Y-%m-%d"));
        }
        Commands::Password { current, new } => {
            api.change_password(ctx.session()?.user_id, &current, &new)?;
            println!("Password changed");
        }
        Commands::DeleteAccount { user_id, yes } => {
            let own_id = ctx.session()?.user_id;
            let target = user_id.unwrap_or(own_id);
            if !yes {
                bail!("Refusing to delete account {target} without --yes");
            }
            let summary = api.delete_account(target)?;
            println!(
                "Deleted account {}: {} recipes, {} ratings, {} saved recipes, {} profile",
                summary.user_id,
                summary.recipes,
                summary.ratings,
                summary.saved_recipes,
                summary.profiles
            );
            if target == own_id {
                ctx.store.clear()?;
            }
        }
        Commands::Recipes(cmd) => run_recipes(&api, cmd)?,
        Commands::Ingredients(cmd) => run_ingredients(&api, cmd)?,
        Commands::Rate {
            recipe_id,
            score,
            review,
        } => {
            let score = Score::new(score)?;
            let res = api.rate(recipe_id, score, review.as_deref())?;
            println!(
                "Rated {}/5. Recipe average is now {:.1} over {} ratings",
                res.rating.score, res.average_rating, res.rating_count
            );
        }
        Commands::Ratings { recipe_id } => {
            for rating in api.ratings(recipe_id)? {
                let who = rating
                    .username
                    .unwrap_or_else(|| format!("user {}", rating.user_id));
                println!(
                    "{} {} by {} on {}",
                    style(format!("#{}", rating.id)).dim(),
                    style("*".repeat(rating.score.max(0) as usize)).yellow(),
                    who,
                    rating.posted_at.format("%Y-%m-%d")
                );
                if let Some(review) = rating.review {
                    println!("    {review}");
                }
            }
        }
        Commands::Save { recipe_id } => {
            api.save(recipe_id)?;
            println!("Saved recipe {recipe_id}");
        }
        Commands::Unsave { recipe_id } => {
            api.unsave(recipe_id)?;
            println!("Removed recipe {recipe_id} from saved");
        }
        Commands::Saved => {
            for saved in api.saved()? {
                println!(
                    "{:>5}  {}  (saved {})",
                    saved.recipe.id,
                    style(&saved.recipe.name).bold(),
                    saved.saved_at.format("%Y-%m-%d")
                );
            }
        }
        Commands::Profile(cmd) => run_profile(ctx, &api, cmd)?,
        Commands::Stats { total: Some(total) } => {
            let res = api.total(total.path_segment())?;
            println!("{}: {}", total.path_segment(), res.total);
        }
        Commands::Stats { total: None } => {
            let stats = api.stats()?;
            println!("users:   {}", stats.users);
            println!("admins:  {}", stats.admins);
            println!("recipes: {}", stats.recipes);
            println!("ratings: {}", stats.ratings);
        }
    }

    Ok(())
}

fn run_recipes(api: &ApiClient, cmd: RecipeCommands) -> Result<()> {
    match cmd {
        RecipeCommands::List(args) => {
            let page = api.recipes(&RecipeFilter {
                page: args.page,
                per_page: args.per_page,
                search: args.search,
                approved: args.approved,
                user_id: args.user_id,
                sort_by: args.sort_by,
                sort_order: args.sort_order,
            })?;
            for r in &page.data {
                let rating = r
                    .average_rating
                    .map(|a| format!("{a:.1}"))
                    .unwrap_or_else(|| "-".into());
                let approved = if r.is_approved { "" } else { " (pending)" };
                println!(
                    "{:>5}  {:<40} {:>4} min  {:>3}{}",
                    r.id, r.name, r.time_to_make, rating, approved
                );
            }
            println!(
                "{}",
                style(format!(
                    "page {}/{} ({} recipes, {} per page)",
                    page.pagination.page,
                    page.pagination.total_pages.max(1),
                    page.pagination.total,
                    page.pagination.per_page
                ))
                .dim()
            );
        }
        RecipeCommands::Show { recipe_id } => print_recipe(&api.recipe(recipe_id)?),
        RecipeCommands::Create {
            name,
            description,
            instructions,
            time,
            ingredients,
        } => {
            let recipe = api.create_recipe(&NewRecipe {
                name,
                description,
                instructions,
                time_to_make: time,
                ingredients,
            })?;
            println!("{} recipe {}", style("Created").green(), recipe.id);
        }
        RecipeCommands::Delete { recipe_id } => {
            api.delete_recipe(recipe_id)?;
            println!("Deleted recipe {recipe_id}");
        }
        RecipeCommands::Approve { recipe_id, revoke } => {
            let recipe = api.set_approval(recipe_id, !revoke)?;
            println!(
                "Recipe {} is now {}",
                recipe.id,
                if recipe.is_approved { "approved" } else { "pending" }
            );
        }
    }
    Ok(())
}

fn print_recipe(recipe: &client::Recipe) {
    println!("{}", style(&recipe.name).bold().underlined());
    if let Some(ref author) = recipe.author_username {
        println!("by {author}");
    }
    if !recipe.description.is_empty() {
        println!("\n{}", recipe.description);
    }
    println!(
        "\n{} min | rating {} | {}",
        recipe.time_to_make,
        recipe
            .average_rating
            .map(|a| format!("{a:.1}/5"))
            .unwrap_or_else(|| "unrated".into()),
        if recipe.is_approved { "approved" } else { "pending approval" }
    );
    if !recipe.ingredients.is_empty() {
        println!("\n{}", style("Ingredients").bold());
        for line in &recipe.ingredients {
            let allergen = if line.is_allergen { " (allergen)" } else { "" };
            println!("  - {} {}{}", line.quantity, line.name, allergen);
        }
    }
    println!("\n{}\n{}", style("Instructions").bold(), recipe.instructions);
}

fn run_ingredients(api: &ApiClient, cmd: IngredientCommands) -> Result<()> {
    match cmd {
        IngredientCommands::List { category } => {
            for i in api.ingredients(category.as_deref())? {
                let allergen = if i.is_allergen { " (allergen)" } else { "" };
                println!("{:>5}  {:<30} {}{}", i.id, i.name, i.category, allergen);
                if let Some(info) = i.nutrition_info {
                    println!("       {}", style(info).dim());
                }
            }
        }
        IngredientCommands::Add {
            name,
            category,
            allergen,
            nutrition,
        } => {
            let created = api.add_ingredient(&NewIngredient {
                name,
                category,
                is_allergen: allergen,
                nutrition_info: nutrition,
            })?;
            println!("{} ingredient {} ({})", style("Added").green(), created.name, created.id);
        }
        IngredientCommands::ForRecipe { recipe_id } => {
            for line in api.recipe_ingredients(recipe_id)? {
                println!(
                    "{:>5}  {:<30} {} [{}]",
                    line.ingredient_id, line.name, line.quantity, line.category
                );
            }
        }
    }
    Ok(())
}

fn run_profile(ctx: &App, api: &ApiClient, cmd: ProfileCommands) -> Result<()> {
    let profile = match cmd {
        ProfileCommands::Show { user_id: Some(id) } => api.profile(id)?,
        ProfileCommands::Show { user_id: None } => {
            ctx.session()?;
            api.own_profile()?
        }
        ProfileCommands::Set {
            display_name,
            bio,
            pronouns,
            image_url,
        } => {
            let body = profile_update_body([
                ("display_name", display_name),
                ("bio", bio),
                ("pronouns", pronouns),
                ("image_url", image_url),
            ]);
            api.update_profile(&body)?
        }
    };

    println!(
        "{} ({}) #{}",
        style(&profile.display_name).bold(),
        profile.username,
        profile.user_id
    );
    if let Some(pronouns) = profile.pronouns {
        println!("  pronouns: {pronouns}");
    }
    if let Some(image_url) = profile.image_url {
        println!("  avatar:   {image_url}");
    }
    if let Some(bio) = profile.bio {
        println!("\n{bio}");
    }
    Ok(())
}
