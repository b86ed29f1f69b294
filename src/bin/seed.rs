use chickzone_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(&config.database_url).await?;

    let admin_id = ensure_user(&pool, "ChickZone Admin", "admin@chickzone.local", "admin").await?;
    let customer_id = ensure_user(&pool, "Demo Customer", "customer@chickzone.local", "customer").await?;
    seed_menu(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {customer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    full_name: &str,
    email: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, full_name, email, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_menu(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (name, description, price in cents, discount percent, available)
    let menu = [
        ("Original Bucket", "Eight pieces of our signature fried chicken", 1899, 0, true),
        ("Spicy Wings", "Six wings tossed in house hot sauce", 799, 10, true),
        ("Zinger Burger", "Crispy fillet, lettuce and spicy mayo", 650, 0, true),
        ("Loaded Fries", "Fries with cheese sauce and jalapenos", 450, 15, true),
        ("Seasonal Pie", "Baked fresh when the season allows", 350, 0, false),
    ];

    for (name, description, cents, discount, available) in menu {
        sqlx::query(
            r#"
            INSERT INTO menus (id, name, description, price, discount, available)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(Decimal::new(cents, 2))
        .bind(Decimal::from(discount))
        .bind(available)
        .execute(pool)
        .await?;
    }

    println!("Seeded menu");
    Ok(())
}
