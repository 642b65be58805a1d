//! shop-admin - command-line administration for the shop backend

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shop_admin::auth::{self, LoginFlow, LoginOutcome};
use shop_admin::config::LoginVariant;
use shop_admin::domain::{CategoryForm, DateRange, DiscountUpdate, Granularity, Money, NewDiscountCode, NewStaff, NotificationForm, OrderStatus, ProductStatus, Role};
use shop_admin::print::{self, PrintPayload};
use shop_admin::session::FileSessionStore;
use shop_admin::views::{
    AlwaysConfirm, CategoryView, Confirm, DashboardView, DiscountView, NotificationView, OrderBucketView, PaymentTab, ProductDetail, ProductFilter, ProductListView, RoleTab,
    StatisticsView, UsersView,
};
use shop_admin::{AdminConfig, AdminError, ApiClient, DataLayer, Navigation, Route, SessionContext, SessionGuard};

#[derive(Parser)]
#[command(name = "shop-admin", version, about = "Administration client for the shop backend")]
struct Cli {
    /// Backend base URL; overrides SHOP_ADMIN_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Answer yes to every confirmation
    #[arg(long, short = 'y', global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email, password and emailed code
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Request the code first, then submit everything at once
        #[arg(long)]
        otp: bool,
    },
    Logout,
    Whoami,
    Dashboard {
        /// Days of revenue to chart
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Sales statistics over a generated series
    Stats {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long, default_value = "day")]
        granularity: Granularity,
    },
    Orders {
        #[command(subcommand)]
        command: OrdersCommand,
    },
    Products {
        #[command(subcommand)]
        command: ProductsCommand,
    },
    Categories {
        #[command(subcommand)]
        command: CategoriesCommand,
    },
    Discounts {
        #[command(subcommand)]
        command: DiscountsCommand,
    },
    Notifications {
        #[command(subcommand)]
        command: NotificationsCommand,
    },
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
    Staff {
        #[command(subcommand)]
        command: StaffCommand,
    },
    /// Print link for an order
    PrintUrl {
        order_id: String,
        /// Bucket holding the order; every bucket is searched when omitted
        #[arg(long)]
        status: Option<OrderStatus>,
        #[arg(long)]
        text: bool,
    },
    /// Serve the printable receipt page
    ServePrint {
        #[arg(long)]
        addr: Option<std::net::SocketAddr>,
    },
}

#[derive(Subcommand)]
enum OrdersCommand {
    List {
        status: OrderStatus,
        #[arg(long, default_value = "all")]
        tab: PaymentTab,
    },
    /// Move orders to the next status of their bucket
    Advance {
        status: OrderStatus,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ProductsCommand {
    List {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        status: Option<ProductStatus>,
    },
    Show { id: String },
}

#[derive(Subcommand)]
enum CategoriesCommand {
    List,
    Create { name: String },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
}

#[derive(Subcommand)]
enum DiscountsCommand {
    List,
    Create {
        #[arg(long)]
        code: String,
        #[arg(long)]
        percentage: i64,
        #[arg(long)]
        min_order: i64,
        /// Last valid day, in the business timezone
        #[arg(long)]
        expires: NaiveDate,
        #[arg(long)]
        usage_limit: i64,
    },
    Update {
        id: String,
        #[arg(long)]
        percentage: Option<i64>,
        #[arg(long)]
        min_order: Option<i64>,
        #[arg(long)]
        usage_limit: Option<i64>,
    },
    Delete { id: String },
}

#[derive(Subcommand)]
enum NotificationsCommand {
    List,
    Send {
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    List {
        #[arg(long)]
        role: Option<Role>,
    },
}

#[derive(Subcommand)]
enum StaffCommand {
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
    },
    Delete { id: String },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run(Cli::parse()).await {
        match e.downcast_ref::<AdminError>() {
            Some(AdminError::Validation(errors)) => {
                eprintln!("Please fix the following:");
                for field in errors.fields() {
                    for message in errors.field(field) {
                        eprintln!("  {field}: {message}");
                    }
                }
            }
            Some(admin) => eprintln!("{}", admin.user_message()),
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn ask(question: &str) -> bool {
    prompt(&format!("{question} [y/N]")).map(|a| matches!(a.to_ascii_lowercase().as_str(), "y" | "yes")).unwrap_or(false)
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AdminConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    let store = Arc::new(FileSessionStore::new(config.session_file.clone()));
    let session = SessionContext::load(store)?;
    let api = ApiClient::new(config.clone(), session.clone())?;
    let data = DataLayer::new(api.clone());
    let confirm: &dyn Confirm = if cli.yes { &AlwaysConfirm } else { &ask };

    match cli.command {
        Command::Login { email, otp } => login(&api, email, otp).await,
        Command::Logout => {
            data.shutdown();
            println!("{}", auth::logout(&api).await.notice());
            Ok(())
        }
        Command::ServePrint { addr } => print::serve(addr.unwrap_or(config.print_addr), config.timezone).await,
        command => {
            guard(&api, &route_of(&command)).await?;
            protected(command, &config, &data, &session, confirm).await
        }
    }
}

fn route_of(command: &Command) -> Route {
    match command {
        Command::Orders { command: OrdersCommand::List { status, .. } | OrdersCommand::Advance { status, .. } } => Route::Orders(*status),
        Command::Products { command: ProductsCommand::Show { id } } => Route::ProductDetail(id.clone()),
        Command::Products { .. } => Route::Products,
        Command::Categories { .. } => Route::Categories,
        Command::Discounts { .. } => Route::Discounts,
        Command::Notifications { .. } => Route::Notifications,
        Command::Users { .. } | Command::Staff { .. } => Route::Users,
        Command::Stats { .. } => Route::Statistics,
        Command::PrintUrl { .. } => Route::Orders(OrderStatus::Pending),
        _ => Route::Dashboard,
    }
}

async fn guard(api: &ApiClient, route: &Route) -> Result<()> {
    match SessionGuard::new(api.clone()).resolve(route, None).await {
        Navigation::Render(_) => Ok(()),
        Navigation::Redirect { to: Route::Login, .. } => bail!("Not signed in. Run `shop-admin login` first."),
        Navigation::Redirect { to, .. } => bail!("Redirected to {to}"),
    }
}

async fn login(api: &ApiClient, email: Option<String>, otp: bool) -> Result<()> {
    let mut flow = LoginFlow::new(api.clone(), None);
    if otp {
        flow = flow.with_variant(LoginVariant::SendCodeFirst);
    }
    let email = match email {
        Some(email) => email,
        None => prompt("Email")?,
    };

    let password = match flow.variant() {
        LoginVariant::TwoStep => {
            let password = prompt("Password")?;
            match flow.submit_credentials(&email, &password).await? {
                LoginOutcome::SignedIn { event, route } => return signed_in(event.notice(), route),
                LoginOutcome::CodeSent { message } => println!("{message}"),
            }
            None
        }
        LoginVariant::SendCodeFirst => {
            if let LoginOutcome::CodeSent { message } = flow.send_code(&email).await? {
                println!("{message}");
            }
            Some(prompt("Password")?)
        }
    };

    loop {
        let code = prompt("Code (r to resend)")?;
        if code.eq_ignore_ascii_case("r") {
            match flow.resend_code().await {
                Ok(LoginOutcome::CodeSent { message }) => println!("{message}"),
                Ok(_) => {}
                Err(e) => eprintln!("{}", e.user_message()),
            }
            continue;
        }
        match flow.submit_otp(&code, password.as_deref()).await {
            Ok(LoginOutcome::SignedIn { event, route }) => return signed_in(event.notice(), route),
            Ok(LoginOutcome::CodeSent { message }) => println!("{message}"),
            Err(e @ AdminError::Validation(_)) => eprintln!("{e}"),
            Err(e) => return Err(e.into()),
        }
    }
}

fn signed_in(notice: String, route: Route) -> Result<()> {
    println!("{notice}");
    tracing::debug!(%route, "Landing route");
    Ok(())
}

async fn protected(command: Command, config: &AdminConfig, data: &DataLayer, session: &SessionContext, confirm: &dyn Confirm) -> Result<()> {
    let tz = config.timezone;
    let today = Utc::now().with_timezone(&tz).date_naive();
    match command {
        Command::Whoami => {
            let current = session.current().context("no session")?;
            let role = current.role.map_or("unknown", |r| r.as_str());
            println!("{} <{}> ({role})", current.display_name.unwrap_or_default(), current.email);
        }
        Command::Dashboard { days } => {
            let range = DateRange::new(today - Duration::days(days.max(1) - 1), today).context("invalid range")?;
            let mut view = DashboardView::new(data);
            view.load(range).await?;
            for card in view.stat_cards() {
                println!("{:<10} {}", card.label, card.value);
            }
            println!();
            for bucket in view.chart(range) {
                println!("{bucket}");
            }
        }
        Command::Stats { from, to, granularity } => {
            let range = DateRange::new(from, to).context("--from must not be after --to")?;
            for bucket in StatisticsView::sample(range).buckets(range, granularity) {
                println!("{bucket}");
            }
        }
        Command::Orders { command } => orders(command, data).await?,
        Command::Products { command } => match command {
            ProductsCommand::List { query, category, status } => {
                let mut view = ProductListView::new(data);
                view.filter = ProductFilter { query, category_id: category, status };
                view.load().await?;
                for row in view.rows() {
                    let discount = if row.discount_percent > 0 { format!(" -{}%", row.discount_percent) } else { String::new() };
                    println!("{:<12} {:<30} {:<12} {:>28} stock {:>4} {}{discount}", row.id, row.name, row.category, row.price, row.stock, row.status);
                }
            }
            ProductsCommand::Show { id } => {
                let detail = ProductDetail::load(data, &id).await?;
                let p = &detail.product;
                println!("{} ({})\n{}\nPrice: {}  Cost: {}  Status: {}", p.name, p.id, p.description, p.price_range(), p.input_cost, p.status);
                if p.has_active_discount {
                    println!("Part of a running discount; editing is locked");
                }
                for line in detail.variant_lines() {
                    println!("  {line}");
                }
                for url in &p.images {
                    println!("  image: {url}");
                }
            }
        },
        Command::Categories { command } => {
            let mut view = CategoryView::new(data);
            view.load().await?;
            match command {
                CategoriesCommand::List => {
                    for c in view.categories() {
                        println!("{:<12} {:<30} {}", c.id, c.name, if c.is_active { "active" } else { "inactive" });
                    }
                }
                CategoriesCommand::Create { name } => println!("{}", view.create(&name).await?.notice()),
                CategoriesCommand::Update { id, name, active } => {
                    let current = view.find(&id).map(CategoryForm::from_category).unwrap_or_default();
                    let form = CategoryForm { name: name.unwrap_or(current.name), is_active: active.unwrap_or(current.is_active) };
                    println!("{}", view.update(&id, form).await?.notice());
                }
            }
        }
        Command::Discounts { command } => {
            let mut view = DiscountView::new(data);
            view.load().await?;
            let now = Utc::now();
            match command {
                DiscountsCommand::List => {
                    for r in view.rows(now) {
                        let flags = [(r.editable, "editable"), (r.expired, "expired")]
                            .iter()
                            .filter(|(on, _)| *on)
                            .map(|(_, label)| *label)
                            .collect::<Vec<_>>()
                            .join(",");
                        println!("{:<12} {:<10} {:>3}% min {:>14} used {:<9} expires {} {flags}", r.id, r.code, r.percentage, r.min_order_value, r.usage, r.expires_at);
                    }
                }
                DiscountsCommand::Create { code, percentage, min_order, expires, usage_limit } => {
                    let expires_at = expires
                        .succ_opt()
                        .and_then(|d| d.and_time(NaiveTime::MIN).and_local_timezone(tz).earliest())
                        .context("invalid expiration date")?
                        .with_timezone(&Utc);
                    let form = NewDiscountCode { code, percentage, min_order_value: Money::dong(min_order), expires_at, usage_limit };
                    println!("{}", view.create(&form, now).await?.notice());
                }
                DiscountsCommand::Update { id, percentage, min_order, usage_limit } => {
                    let current = view.find(&id).map(DiscountUpdate::from_code).context("unknown discount code")?;
                    let update = DiscountUpdate {
                        percentage: percentage.unwrap_or(current.percentage),
                        min_order_value: min_order.map_or(current.min_order_value, Money::dong),
                        usage_limit: usage_limit.unwrap_or(current.usage_limit),
                    };
                    println!("{}", view.update(&id, &update, now).await?.notice());
                }
                DiscountsCommand::Delete { id } => match view.delete(&id, confirm).await? {
                    Some(event) => println!("{}", event.notice()),
                    None => println!("Cancelled"),
                },
            }
        }
        Command::Notifications { command } => {
            let mut view = NotificationView::new(data);
            match command {
                NotificationsCommand::List => {
                    view.load().await?;
                    for line in view.lines() {
                        println!("{line}");
                    }
                }
                NotificationsCommand::Send { title, message } => {
                    println!("{}", view.broadcast(&NotificationForm { title, message }).await?.notice());
                }
            }
        }
        Command::Users { command: UsersCommand::List { role } } => {
            let mut view = UsersView::new(data);
            view.load().await?;
            let roles = role.map_or_else(|| Role::ALL.to_vec(), |r| vec![r]);
            for role in roles {
                println!("== {} ==", role.tab_label());
                for u in view.tab(RoleTab(role)) {
                    println!("{:<12} {:<30} {:<24} {:?}", u.id, u.email, u.full_name.as_deref().unwrap_or("-"), u.status);
                }
            }
        }
        Command::Staff { command } => {
            let mut view = UsersView::new(data);
            view.load().await?;
            let outcome = match command {
                StaffCommand::Create { email, full_name } => view.create_staff(&NewStaff { email, full_name }, confirm).await?,
                StaffCommand::Delete { id } => view.delete_staff(&id, confirm).await?,
            };
            println!("{}", outcome.map_or_else(|| "Cancelled".to_string(), |e| e.notice()));
        }
        Command::PrintUrl { order_id, status, text } => {
            let statuses = status.map_or_else(|| OrderStatus::ALL.to_vec(), |s| vec![s]);
            let mut found = None;
            for status in statuses {
                let mut view = OrderBucketView::new(data, status);
                view.load().await?;
                if let Some(order) = view.orders().iter().find(|o| o.id == order_id) {
                    found = Some(order.clone());
                    break;
                }
            }
            let order = found.with_context(|| format!("order {order_id} not found"))?;
            if text {
                println!("{}", print::render_receipt(&order, tz).to_text());
            } else {
                println!("{}", PrintPayload::new(order).print_url(&format!("http://{}/", config.print_addr))?);
            }
        }
        Command::Login { .. } | Command::Logout | Command::ServePrint { .. } => bail!("command does not run behind the session guard"),
    }
    Ok(())
}

async fn orders(command: OrdersCommand, data: &DataLayer) -> Result<()> {
    match command {
        OrdersCommand::List { status, tab } => {
            let mut view = OrderBucketView::new(data, status);
            view.load().await?;
            view.set_tab(tab);
            let spec = view.spec();
            let cards = view.cards();
            println!("{} ({} orders)", spec.title, cards.len());
            for card in cards {
                println!("\n#{} {} {}", card.id, card.customer, if card.paid { "[paid]" } else { "[unpaid]" });
                println!("  {} / {}", card.address, card.phone);
                for line in &card.lines {
                    println!("  {line}");
                }
                println!("  total {}  payable {}", card.total, card.payable);
            }
            if let Some(action) = spec.action_label {
                println!("\nAction: {action} (shop-admin orders advance {} <ids...>)", spec.status);
            }
        }
        OrdersCommand::Advance { status, ids } => {
            let mut view = OrderBucketView::new(data, status);
            view.load().await?;
            for id in &ids {
                if !view.toggle(id) {
                    bail!("order {id} is not in {}", view.spec().title);
                }
            }
            match view.submit_transition().await? {
                Some(event) => println!("{}", event.notice()),
                None => println!("{} has no forward action", view.spec().title),
            }
        }
    }
    Ok(())
}
